//
// stats.rs
// Dicom-Anonymizer-rs
//
// Per-run outcome counters owned by a single directory walk.
//
// Thales Matheus Mendonça Santos - November 2025

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_files: u64,
    pub anonymized: u64,
    pub failed: u64,
    pub copied_non_dicom: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_visit(&mut self) {
        self.total_files += 1;
    }

    pub fn record_anonymized(&mut self) {
        self.anonymized += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn record_copy(&mut self) {
        self.copied_non_dicom += 1;
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Every visited file lands in exactly one outcome bucket.
    pub fn is_balanced(&self) -> bool {
        self.total_files == self.anonymized + self.failed + self.copied_non_dicom
    }
}
