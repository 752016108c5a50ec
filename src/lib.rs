//
// lib.rs
// Dicom-Anonymizer-rs
//
// Exposes the crate's modules and re-exports the CLI entry point for both binary and library consumers.
//
// Thales Matheus Mendonça Santos - November 2025

// Leaves first: policy and value generation, then the rewriter, walker and reporting on top.
pub mod anonymize;
pub mod cli;
pub mod config;
pub mod dicom_access;
pub mod error;
pub mod generator;
pub mod logging;
pub mod models;
pub mod policy;
pub mod report;
pub mod stats;
pub mod walker;

#[cfg(test)]
mod testing;

pub use cli::{run as run_cli, Cli, Commands, RunStatus};
