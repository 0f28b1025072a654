use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

use manifest_drift::config::Config;
use manifest_drift::detector::{Scanner, create_default_detectors};
use manifest_drift::logging;
use manifest_drift::manifest::load_directory;
use manifest_drift::report::{OutputFormat, render};

/// Exit status when at least one reference is stale
const EXIT_STALE: u8 = 1;
/// Exit status for fatal errors
const EXIT_FAILURE: u8 = 2;

#[derive(Parser)]
#[command(name = "manifest-drift")]
#[command(version, about = "Detect outdated Helm chart releases and container images in manifests")]
struct Cli {
    /// Directory searched recursively for manifests
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Config file (defaults to $XDG_CONFIG_HOME/manifest-drift/config.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write JSON logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match logging::init(cli.verbose, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    match run(&cli) {
        Ok(true) => ExitCode::from(EXIT_STALE),
        Ok(false) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

/// Scan, print the report, and return whether anything is stale
fn run(cli: &Cli) -> anyhow::Result<bool> {
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    debug!("Configuration: {:?}", config);

    let documents = load_directory(&cli.dir, &config.scan.extensions)
        .with_context(|| format!("Failed to scan {}", cli.dir.display()))?;
    info!("Classified {} documents under {}", documents.len(), cli.dir.display());

    let scanner = Scanner::new(create_default_detectors(&config));
    let report = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(scanner.scan(&documents));

    let output = render(&report, cli.format)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;

    Ok(report.stale)
}
