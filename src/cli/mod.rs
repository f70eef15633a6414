pub mod commands;

use clap::Parser;

pub use commands::{Commands, ScanArgs, ShowArgs};

/// Trisast — Combined SAST pipeline
///
/// Uploads one artifact to Semgrep, ShiftLeft, and CodeQL in sequence
/// and merges their findings into a single deduplicated report.
#[derive(Parser, Debug)]
#[command(
    name = "trisast",
    version,
    about = "Combined SAST pipeline — three scanners, one report",
    long_about = "Trisast drives three static-analysis scanners against a single uploaded\nartifact, in a fixed sequence, and merges their findings into one\ndeduplicated, severity-ranked, enriched report."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}
