// src/pipeline/stream.rs
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::time::Instant;

use crate::assembler::CompositePattern;
use crate::error::ScanError;
use crate::formatters::text::TextFormatter;
use crate::formatters::EntryFormatter;
use crate::pipeline::config::GlossConfig;
use crate::pipeline::context::ScanStats;
use crate::variables::ParsedLine;

/// Source name that reads standard input
pub const STDIN_SOURCE: &str = "-";

/// Matches, binds, filters and prints log lines, one source at a time
pub struct LineScanner<'a> {
    config: &'a GlossConfig,
    pattern: &'a CompositePattern,
    projection: Vec<String>,
    formatter: TextFormatter,
    stats: ScanStats,
}

impl<'a> LineScanner<'a> {
    pub fn new(config: &'a GlossConfig, pattern: &'a CompositePattern) -> Self {
        let projection = config
            .select
            .clone()
            .unwrap_or_else(|| pattern.default_projection());
        LineScanner {
            config,
            pattern,
            projection,
            formatter: TextFormatter,
            stats: ScanStats::default(),
        }
    }

    pub fn projection(&self) -> &[String] {
        &self.projection
    }

    /// Scan one logfile. A file that cannot be opened is skipped with a warning.
    pub fn scan_source<W: Write>(&mut self, path: &Path, output: &mut W) -> Result<(), ScanError> {
        if path == Path::new(STDIN_SOURCE) {
            let stdin = io::stdin();
            return self.scan_reader("<stdin>", stdin.lock(), output);
        }
        let name = path.display().to_string();
        match File::open(path) {
            Ok(file) => self.scan_reader(&name, BufReader::new(file), output),
            Err(e) => {
                self.skip_source(&name, &e);
                Ok(())
            }
        }
    }

    /// Scan every line of `input`. A read error ends this source with a
    /// warning; entries already written stay written.
    pub fn scan_reader<R: BufRead, W: Write>(
        &mut self,
        name: &str,
        mut input: R,
        output: &mut W,
    ) -> Result<(), ScanError> {
        let start_time = Instant::now();
        tracing::debug!(source = name, "scanning source");

        let mut buf = Vec::new();
        let mut line_number = 0;
        let mut failed = false;
        loop {
            buf.clear();
            match input.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    self.skip_source(name, &e);
                    failed = true;
                    break;
                }
            }
            line_number += 1;
            let text = String::from_utf8_lossy(&buf);
            let line: &str = &text;
            let line = line.strip_suffix('\n').unwrap_or(line);
            let line = line.strip_suffix('\r').unwrap_or(line);
            self.scan_line(name, line_number, line, output)?;
        }

        if !failed {
            self.stats.sources_scanned += 1;
        }
        self.stats.processing_time += start_time.elapsed();
        tracing::debug!(source = name, lines = line_number, "finished source");
        Ok(())
    }

    /// Handle one line; returns whether it was selected and printed.
    pub fn scan_line<W: Write>(
        &mut self,
        source: &str,
        line_number: usize,
        line: &str,
        output: &mut W,
    ) -> Result<bool, ScanError> {
        self.stats.lines_read += 1;

        let Some(caps) = self.pattern.captures(line) else {
            self.stats.lines_unrecognised += 1;
            if self.config.verbose > 0 {
                eprintln!(
                    "gloss: {}:{}: Unrecognised line format: {}",
                    source, line_number, line
                );
                self.stats.warnings += 1;
            }
            return Ok(false);
        };
        self.stats.lines_matched += 1;

        let parsed = self.pattern.bind(&caps);
        if !self.config.where_clause.evaluate(&parsed) {
            return Ok(false);
        }

        self.write_entry(&parsed, output)?;
        self.stats.entries_selected += 1;
        Ok(true)
    }

    /// Print the projected variables; absent ones are left out.
    fn write_entry<W: Write>(&self, parsed: &ParsedLine, output: &mut W) -> Result<(), ScanError> {
        let fields: Vec<(&str, &str)> = self
            .projection
            .iter()
            .filter_map(|name| parsed.lookup(name).map(|value| (name.as_str(), value)))
            .collect();
        self.formatter.write_entry(output, &fields)?;
        Ok(())
    }

    fn skip_source(&mut self, name: &str, error: &io::Error) {
        eprintln!("gloss: Skipping non-accessible --logfile {} ({})", name, error);
        self.stats.sources_skipped += 1;
        self.stats.warnings += 1;
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn finish(self) -> ScanStats {
        self.stats
    }
}
