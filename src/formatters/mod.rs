use std::io::{self, Write};

/// Writes the projected variables of one selected log entry
pub trait EntryFormatter {
    fn write_entry(&self, output: &mut dyn Write, fields: &[(&str, &str)]) -> io::Result<()>;
}

pub mod text;
