//
// models.rs
// Dicom-Anonymizer-rs
//
// Defines serializable data structures for run summaries, CSV audit rows, and the printable policy table.
//
// Thales Matheus Mendonça Santos - November 2025

use serde::{Deserialize, Serialize};

use crate::config::ReplacementMode;
use crate::stats::RunStats;

/// Machine-readable counterpart of the text summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub mode: ReplacementMode,
    #[serde(flatten)]
    pub stats: RunStats,
    pub elapsed_seconds: f64,
}

/// One line of the CSV audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRow {
    #[serde(rename = "File_Path")]
    pub file_path: String,
    #[serde(rename = "Original_PatientID")]
    pub original_patient_id: String,
    #[serde(rename = "Original_PatientName")]
    pub original_patient_name: String,
    #[serde(rename = "New_PatientID")]
    pub new_patient_id: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Status")]
    pub status: String,
}

/// Resolved rule for one attribute, as shown by the `policy` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRow {
    pub attribute: String,
    pub tag: String,
    pub rule: String,
}
