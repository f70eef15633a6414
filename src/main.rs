mod cli;
mod config;
mod enrich;
mod error;
mod pipeline;
mod report;
mod rules;
mod scanner;
mod store;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, ScanArgs, ShowArgs};
use config::TrisastConfig;
use pipeline::Pipeline;
use report::finding::{CombinedReport, Severity};
use scanner::{http::HttpScannerClient, Artifact};
use store::{HttpStore, NoStore, ReportStore};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("trisast=debug")
    } else if cli.quiet {
        EnvFilter::new("trisast=error")
    } else {
        EnvFilter::new("trisast=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    info!("Trisast v{}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        cli::Commands::Scan(args) => run_scan(args),
        cli::Commands::Show(args) => run_show(args),
        cli::Commands::Init => config::init_config(),
    }
}

fn run_scan(args: &ScanArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config = TrisastConfig::load(&cwd).unwrap_or_default();

    let artifact = Artifact::from_path(&args.artifact)?;
    let raw_rules = match &args.rules {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read rules file {}", path.display()))?,
        ),
        None => None,
    };

    let timeout = Duration::from_secs(config.http.timeout_secs);
    let client = HttpScannerClient::new(config.endpoints.clone(), timeout)?;

    let store: Box<dyn ReportStore> = match (&config.endpoints.store, args.no_persist) {
        (Some(url), false) => Box::new(HttpStore::new(url.clone(), timeout)?),
        _ => Box::new(NoStore),
    };

    let settle = Duration::from_millis(args.settle_ms.unwrap_or(config.pipeline.settle_ms));
    let mut pipeline = Pipeline::new(client, store, settle);

    let report = pipeline.run(&artifact, raw_rules.as_deref())?;

    // Output the report
    let format = args
        .format
        .clone()
        .unwrap_or_else(|| config.output.format.clone());
    match format.as_str() {
        "json" => {
            let output = report::json::render(&report)?;
            if let Some(ref path) = args.out {
                std::fs::write(path, &output)?;
                info!("Report written to {}", path.display());
            } else {
                println!("{}", output);
            }
        }
        _ => {
            report::terminal::render(&report);
            if let Some(ref path) = args.out {
                let json_output = report::json::render(&report)?;
                std::fs::write(path, &json_output)?;
                info!("JSON report also written to {}", path.display());
            }
        }
    }

    // Exit code based on findings
    if let Some(ref fail_on) = args.fail_on {
        let threshold = Severity::from_str(fail_on);
        if report.has_findings_at_or_above(threshold) {
            std::process::exit(1);
        }
    }

    Ok(())
}

fn run_show(args: &ShowArgs) -> Result<()> {
    let content = std::fs::read_to_string(&args.report)
        .with_context(|| format!("failed to read report {}", args.report.display()))?;
    let report: CombinedReport = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a stored report", args.report.display()))?;

    report::terminal::render_stored(&report);
    Ok(())
}
