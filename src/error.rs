//
// error.rs
// Dicom-Anonymizer-rs
//
// Typed errors for attribute assignment, per-file processing, directory walks, and configuration loading.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;

use dicom::core::{Tag, VR};
use thiserror::Error;

use crate::stats::RunStats;

/// Failure to assign a single attribute. Recoverable: the rest of the record is still rewritten.
#[derive(Debug, Error)]
pub enum AttributeError {
    #[error("attribute {tag} is not present")]
    Missing { tag: Tag },
    #[error("attribute {tag} has non-textual VR {vr:?}")]
    IncompatibleVr { tag: Tag, vr: VR },
}

/// Failure of one file. The walk counts it and moves on.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },
    #[error("written file {path} failed validation: {message}")]
    Validation { path: PathBuf, message: String },
    #[error("failed to create backup {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Whole-run failures.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("input directory does not exist: {0}")]
    InputMissing(PathBuf),
    #[error("output directory is the input directory: {0}")]
    OutputIsInput(PathBuf),
    #[error("failed to create output directory {path}: {source}")]
    OutputRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("interrupted after {} file(s)", .stats.total_files)]
    Interrupted { stats: RunStats },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
