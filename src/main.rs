use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use geochem_dataset::config::Config;
use geochem_dataset::dataset::is_valid_dataset_name;
use geochem_dataset::{Dataset, DatasetError, DatasetOptions};

#[derive(Parser)]
#[command(name = "geochem-dataset")]
#[command(about = "Validate and export geochemistry Excel datasets", long_about = None)]
struct Cli {
    /// Keep unexpected columns instead of rejecting the sheet
    #[arg(long)]
    extra_columns_ok: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check every workbook and cross-reference of each dataset
    Validate {
        /// Dataset directories (default: every dataset under GEOCHEM_DATASETS_DIR)
        paths: Vec<PathBuf>,
    },
    /// Print record counts
    Stats { paths: Vec<PathBuf> },
    /// Print documents, surveys, samples and results as JSON
    Export { paths: Vec<PathBuf> },
}

impl Command {
    fn paths(&self) -> &[PathBuf] {
        match self {
            Command::Validate { paths } | Command::Stats { paths } | Command::Export { paths } => {
                paths
            }
        }
    }
}

/// Explicit paths, or every dataset directory under the configured root
fn resolve_paths(paths: &[PathBuf], config: &Config) -> Result<Vec<PathBuf>, DatasetError> {
    if !paths.is_empty() {
        return Ok(paths.to_vec());
    }

    let Some(root) = &config.datasets_dir else {
        return Ok(Vec::new());
    };

    let entries = fs::read_dir(root).map_err(|_| DatasetError::DatasetNotFound {
        path: root.clone(),
    })?;
    let mut found: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter(|path| {
            path.file_name()
                .is_some_and(|n| is_valid_dataset_name(&n.to_string_lossy()))
        })
        .collect();
    found.sort();
    Ok(found)
}

fn progress(len: usize) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );
    Ok(pb)
}

fn validate(dataset: &Dataset) -> bool {
    match dataset.validate() {
        Ok(()) => {
            println!("{}: VALID", dataset.name());
            true
        }
        Err(report) => {
            println!("{}: INVALID", dataset.name());
            for e in &report.errors {
                println!("  {e}");
            }
            false
        }
    }
}

fn export(dataset: &Dataset) -> Result<serde_json::Value, DatasetError> {
    let results: Vec<_> = dataset.analysis_bulk_results()?.collect();
    Ok(json!({
        "dataset": dataset.name(),
        "documents": dataset.documents()?,
        "surveys": dataset.surveys()?,
        "samples": dataset.samples()?,
        "results": results,
    }))
}

#[instrument(skip_all)]
fn run(cli: Cli, config: Config) -> Result<bool, Box<dyn std::error::Error>> {
    let options = DatasetOptions {
        extra_columns_ok: cli.extra_columns_ok || config.extra_columns_ok,
    };

    let paths = resolve_paths(cli.command.paths(), &config)?;
    if paths.is_empty() {
        return Err("no dataset paths given and GEOCHEM_DATASETS_DIR is not set".into());
    }
    info!("Processing {} dataset(s)", paths.len());

    let pb = progress(paths.len())?;
    let mut all_ok = true;
    let mut exports = Vec::new();

    for path in &paths {
        pb.set_message(path.display().to_string());
        let dataset = match Dataset::open(path, options) {
            Ok(dataset) => dataset,
            Err(e) => {
                error!("{}", e);
                pb.println(format!("{}: INVALID\n  {e}", path.display()));
                all_ok = false;
                pb.inc(1);
                continue;
            }
        };

        match &cli.command {
            Command::Validate { .. } => {
                pb.suspend(|| {
                    if !validate(&dataset) {
                        all_ok = false;
                    }
                });
            }
            Command::Stats { .. } => match dataset.stats() {
                Ok(stats) => pb.println(format!("{}: {:?}", dataset.name(), stats)),
                Err(e) => {
                    error!("{}", e);
                    all_ok = false;
                }
            },
            Command::Export { .. } => match export(&dataset) {
                Ok(value) => exports.push(value),
                Err(e) => {
                    error!("{}", e);
                    all_ok = false;
                }
            },
        }
        pb.inc(1);
    }

    pb.finish_with_message("done");

    if matches!(cli.command, Command::Export { .. }) {
        println!("{}", serde_json::to_string_pretty(&exports)?);
    }

    Ok(all_ok)
}

fn main() -> ExitCode {
    // Initialize tracing with environment filter support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,geochem_dataset=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_writer(std::io::stderr),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env();
    info!("Starting geochem-dataset with config: {:?}", config);

    match run(cli, config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{}", e);
            ExitCode::from(2)
        }
    }
}
