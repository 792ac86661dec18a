use crate::formatters::EntryFormatter;
use std::io::{self, Write};

/// One `name=value` line per variable, then a blank line
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormatter;

impl EntryFormatter for TextFormatter {
    fn write_entry(&self, output: &mut dyn Write, fields: &[(&str, &str)]) -> io::Result<()> {
        for (name, value) in fields {
            writeln!(output, "{}={}", name, value)?;
        }
        writeln!(output)
    }
}
