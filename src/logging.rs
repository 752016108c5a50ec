//
// logging.rs
// Dicom-Anonymizer-rs
//
// tracing-subscriber setup: RUST_LOG wins, otherwise info (or debug with --verbose).
//
// Thales Matheus Mendonça Santos - November 2025

use tracing_subscriber::EnvFilter;

pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "dicom_anonymizer=debug"
    } else {
        "dicom_anonymizer=info"
    }
}

pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    // A second init (e.g. from tests) is harmless; keep the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
