//
// config.rs
// Dicom-Anonymizer-rs
//
// Immutable run configuration: built once from defaults, an optional TOML file, and CLI overrides.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_PATIENT_ID: &str = "ANON_PATIENT_001";
pub const DEFAULT_ID_PREFIX: &str = "ANON";

/// How replacement values for dates, times, sex, age and identifiers are produced.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReplacementMode {
    /// Same constants every run.
    #[default]
    Fixed,
    /// Plausible random values and synthetic per-patient identifiers.
    Randomized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnonymizerConfig {
    pub mode: ReplacementMode,
    /// Identifier written to PatientName/PatientID in fixed mode.
    pub patient_id: String,
    /// Prefix of synthetic identifiers in randomized mode.
    pub id_prefix: String,
    /// Seed for reproducible randomized runs.
    pub seed: Option<u64>,
    /// Copy the original to `<file>.backup` before overwriting in place.
    pub backup: bool,
    /// Optional CSV audit trail.
    pub report: Option<PathBuf>,
    /// Re-open every written file and check it reads back.
    pub validate: bool,
}

impl Default for AnonymizerConfig {
    fn default() -> Self {
        Self {
            mode: ReplacementMode::Fixed,
            patient_id: DEFAULT_PATIENT_ID.to_string(),
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            seed: None,
            backup: false,
            report: None,
            validate: false,
        }
    }
}

impl AnonymizerConfig {
    pub fn from_toml_str(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(path, &text)
    }
}
