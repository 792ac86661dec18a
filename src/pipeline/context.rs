// src/pipeline/context.rs
use std::time::Duration;

/// Runtime statistics for one run, accumulated across sources
#[derive(Debug, Default, Clone)]
pub struct ScanStats {
    pub sources_scanned: usize,
    pub sources_skipped: usize,
    pub lines_read: usize,
    pub lines_matched: usize,
    pub lines_unrecognised: usize,
    pub entries_selected: usize,
    /// Anything reported to the user as a warning
    pub warnings: usize,
    pub processing_time: Duration,
}

impl ScanStats {
    pub fn had_warnings(&self) -> bool {
        self.warnings > 0
    }

    /// Process exit status: 0 when the run was clean, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.had_warnings() {
            1
        } else {
            0
        }
    }
}
