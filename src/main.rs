//
// main.rs
// Dicom-Anonymizer-rs
//
// Tokio entry point that hands off execution to the CLI layer and maps the run outcome to an exit status.
//
// Thales Matheus Mendonça Santos - November 2025

use std::process;

use dicom_anonymizer::cli;

#[tokio::main]
async fn main() {
    let code = match cli::run().await {
        Ok(status) => status.code(),
        Err(e) => {
            eprintln!("Unexpected error: {e:#}");
            1
        }
    };
    process::exit(code);
}
