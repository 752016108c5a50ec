//
// cli.rs
// Dicom-Anonymizer-rs
//
// Defines the CLI surface with Clap and dispatches user-selected commands to the corresponding modules.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::anonymize::Rewriter;
use crate::config::{AnonymizerConfig, ReplacementMode};
use crate::dicom_access::FileCodec;
use crate::error::WalkError;
use crate::models::PolicyRow;
use crate::policy::PolicyTable;
use crate::report::{self, AuditLog};
use crate::stats::RunStats;
use crate::walker::{OutputTarget, Walker};
use crate::logging;

/// Command-line interface glue code: defines the available verbs and dispatches to modules.
#[derive(Parser)]
#[command(name = "dicom-anonymizer")]
#[command(about = "Anonymize DICOM files across a directory tree", long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Anonymize every DICOM file under a directory
    Anonymize(AnonymizeArgs),
    /// Print the rule applied to each attribute
    Policy {
        #[arg(long, value_enum, default_value_t = ReplacementMode::Fixed)]
        mode: ReplacementMode,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct AnonymizeArgs {
    /// Input directory containing DICOM files
    #[arg(short, long)]
    pub input: PathBuf,
    /// Output directory (mirrors the input tree)
    #[arg(short, long, required_unless_present = "in_place", conflicts_with = "in_place")]
    pub output: Option<PathBuf>,
    /// Overwrite the input files instead of writing a copy
    #[arg(long)]
    pub in_place: bool,
    /// Replacement identifier for PatientName/PatientID
    #[arg(short, long)]
    pub patient_id: Option<String>,
    #[arg(long, value_enum)]
    pub mode: Option<ReplacementMode>,
    /// Prefix of generated identifiers (randomized mode)
    #[arg(long)]
    pub id_prefix: Option<String>,
    /// Seed for reproducible randomized values
    #[arg(long)]
    pub seed: Option<u64>,
    /// Keep a `.backup` copy of each file overwritten in place
    #[arg(long, conflicts_with = "output")]
    pub backup: bool,
    /// Re-open each written file and count it as failed if it does not read back
    #[arg(long)]
    pub validate: bool,
    /// Write a CSV audit trail
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Print the final summary as JSON
    #[arg(long)]
    pub json: bool,
    /// TOML file with default settings; flags override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl AnonymizeArgs {
    /// Merge defaults, the optional config file and explicit flags into one immutable config.
    pub fn resolve_config(&self) -> anyhow::Result<AnonymizerConfig> {
        let mut config = match &self.config {
            Some(path) => AnonymizerConfig::from_toml_file(path)?,
            None => AnonymizerConfig::default(),
        };
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(id) = &self.patient_id {
            config.patient_id = id.clone();
        }
        if let Some(prefix) = &self.id_prefix {
            config.id_prefix = prefix.clone();
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.backup {
            config.backup = true;
        }
        if self.validate {
            config.validate = true;
        }
        if self.report.is_some() {
            config.report = self.report.clone();
        }
        Ok(config)
    }

    pub fn output_target(&self) -> OutputTarget {
        match (&self.output, self.in_place) {
            (Some(root), false) => OutputTarget::Mirror(root.clone()),
            _ => OutputTarget::InPlace,
        }
    }
}

/// Process exit status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Clean,
    Failures,
    InputMissing,
    Interrupted,
}

impl RunStatus {
    pub fn code(self) -> i32 {
        match self {
            RunStatus::Clean => 0,
            RunStatus::Failures => 1,
            RunStatus::InputMissing => 2,
            RunStatus::Interrupted => 130,
        }
    }

    pub fn from_stats(stats: &RunStats) -> Self {
        if stats.is_clean() {
            RunStatus::Clean
        } else {
            RunStatus::Failures
        }
    }
}

pub async fn run() -> anyhow::Result<RunStatus> {
    // Parse the raw CLI arguments once and dispatch to a subcommand handler.
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Anonymize(args) => anonymize_directory(args).await,
        Commands::Policy { mode, json } => {
            print_policy(mode, json)?;
            Ok(RunStatus::Clean)
        }
    }
}

async fn anonymize_directory(args: AnonymizeArgs) -> anyhow::Result<RunStatus> {
    let started = Instant::now();
    let config = args.resolve_config()?;
    let output = args.output_target();
    let input = args.input.clone();
    let mode = config.mode;

    if !args.json {
        println!("{}", "=".repeat(60));
        println!("DICOM ANONYMIZER");
        println!("{}", "=".repeat(60));
    }
    info!(patient_id = %config.patient_id, "Replacement identifier");

    // Ctrl+C only raises the flag; the walker stops at the next file boundary.
    let cancel = Arc::new(AtomicBool::new(false));
    let listener = {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.store(true, Ordering::SeqCst);
            }
        })
    };

    let result = tokio::task::spawn_blocking(move || -> anyhow::Result<Result<RunStats, WalkError>> {
        let mut walker = Walker::new(Rewriter::new(FileCodec, &config));
        if let (Some(path), true) = (&config.report, input.exists()) {
            let audit = AuditLog::create(path)
                .with_context(|| format!("Failed to create report {}", path.display()))?;
            walker = walker.with_audit(audit);
        }
        Ok(walker.walk(&input, &output, &cancel))
    })
    .await
    .context("Anonymization task panicked")??;

    listener.abort();

    match result {
        Ok(stats) => {
            print_summary(mode, &stats, started, args.json)?;
            Ok(RunStatus::from_stats(&stats))
        }
        Err(WalkError::InputMissing(path)) => {
            eprintln!("Input directory does not exist: {}", path.display());
            Ok(RunStatus::InputMissing)
        }
        Err(WalkError::OutputIsInput(path)) => {
            eprintln!(
                "Output directory is the input directory: {} (use --in-place to overwrite)",
                path.display()
            );
            Ok(RunStatus::Failures)
        }
        Err(WalkError::Interrupted { stats }) => {
            eprintln!("Anonymization interrupted by user");
            print_summary(mode, &stats, started, args.json)?;
            Ok(RunStatus::Interrupted)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_summary(mode: ReplacementMode, stats: &RunStats, started: Instant, json: bool) -> anyhow::Result<()> {
    let elapsed = started.elapsed();
    if json {
        let summary = report::run_summary(mode, stats, elapsed);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", report::render_summary(stats, elapsed));
    }
    Ok(())
}

pub fn policy_rows(mode: ReplacementMode) -> Vec<PolicyRow> {
    PolicyTable::new(mode)
        .entries()
        .iter()
        .map(|entry| PolicyRow {
            attribute: entry.name.to_string(),
            tag: format!("({:04X},{:04X})", entry.tag.group(), entry.tag.element()),
            rule: entry.rule.to_string(),
        })
        .collect()
}

fn print_policy(mode: ReplacementMode, json: bool) -> anyhow::Result<()> {
    let rows = policy_rows(mode);
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    println!("Policy ({:?} mode)", mode);
    for row in rows {
        println!("  {} {:<26} {}", row.tag, row.attribute, row.rule);
    }
    Ok(())
}
