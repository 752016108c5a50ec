//
// report.rs
// Dicom-Anonymizer-rs
//
// Run reporting: fixed-shape text summary, JSON summary, and the optional per-file CSV audit trail.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use chrono::Local;

use crate::anonymize::FileOutcome;
use crate::config::ReplacementMode;
use crate::error::FileError;
use crate::models::{AuditRow, RunSummary};
use crate::stats::RunStats;

pub const AUDIT_HEADER: [&str; 6] = [
    "File_Path",
    "Original_PatientID",
    "Original_PatientName",
    "New_PatientID",
    "Timestamp",
    "Status",
];

const NOT_AVAILABLE: &str = "N/A";
const ERROR: &str = "ERROR";

pub fn render_summary(stats: &RunStats, elapsed: Duration) -> String {
    let rule = "-".repeat(60);
    format!(
        "{rule}\n\
         ANONYMIZATION COMPLETE\n\
         {rule}\n\
         Total files processed: {}\n  \
         Anonymized:          {}\n  \
         Failed:              {}\n  \
         Copied (non-DICOM):  {}\n\
         Time elapsed:          {:.2} seconds\n\
         {rule}",
        stats.total_files,
        stats.anonymized,
        stats.failed,
        stats.copied_non_dicom,
        elapsed.as_secs_f64(),
    )
}

pub fn run_summary(mode: ReplacementMode, stats: &RunStats, elapsed: Duration) -> RunSummary {
    RunSummary {
        mode,
        stats: *stats,
        elapsed_seconds: elapsed.as_secs_f64(),
    }
}

/// CSV audit trail with one row per DICOM-like file.
pub struct AuditLog {
    writer: csv::Writer<Box<dyn Write + Send>>,
}

impl AuditLog {
    pub fn create(path: &Path) -> csv::Result<Self> {
        let file = File::create(path)?;
        Self::from_writer(file)
    }

    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> csv::Result<Self> {
        // Header is written up front so an empty run still produces a valid report.
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Box::new(writer) as Box<dyn Write + Send>);
        writer.write_record(AUDIT_HEADER)?;
        Ok(Self { writer })
    }

    pub fn record_success(&mut self, source: &Path, outcome: &FileOutcome) -> csv::Result<()> {
        let status = if outcome.attributes.failed.is_empty() {
            "Anonymized".to_string()
        } else {
            format!(
                "Anonymized with warnings: {}",
                outcome.attributes.failed.join(" ")
            )
        };
        self.writer.serialize(AuditRow {
            file_path: source.display().to_string(),
            original_patient_id: outcome
                .original_patient_id
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            original_patient_name: outcome
                .original_patient_name
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            new_patient_id: outcome.new_identifier.clone(),
            timestamp: Local::now().to_rfc3339(),
            status,
        })
    }

    pub fn record_failure(&mut self, source: &Path, error: &FileError) -> csv::Result<()> {
        self.writer.serialize(AuditRow {
            file_path: source.display().to_string(),
            original_patient_id: ERROR.to_string(),
            original_patient_name: ERROR.to_string(),
            new_patient_id: ERROR.to_string(),
            timestamp: Local::now().to_rfc3339(),
            status: format!("Error: {}", error),
        })
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}
