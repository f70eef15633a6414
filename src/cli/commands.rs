use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan an artifact with all three scanners and combine the results
    Scan(ScanArgs),

    /// Render a previously persisted report
    Show(ShowArgs),

    /// Initialize a .trisast.toml config file in the current directory
    Init,
}

#[derive(clap::Args, Debug)]
pub struct ScanArgs {
    /// File to scan
    pub artifact: PathBuf,

    /// Custom Semgrep rules (JSON file with a top-level `rules` array).
    /// Applied to the Semgrep stage only.
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Output format: "terminal" or "json"
    #[arg(short, long)]
    pub format: Option<String>,

    /// Write the combined report (JSON) to a file
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Skip persisting the report to the result store
    #[arg(long)]
    pub no_persist: bool,

    /// Pause between scanner stages in milliseconds (overrides config)
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Fail (exit code 1) if findings at or above this severity are found.
    /// Values: ERROR, WARNING, INFO
    #[arg(long)]
    pub fail_on: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Path to a stored report (JSON)
    pub report: PathBuf,
}
