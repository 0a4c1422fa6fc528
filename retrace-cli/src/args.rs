//! Command-line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "retrace")]
#[command(about = "Capture browser interactions and replay them for visual regression")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a recorded artifact on a remote WebDriver session
    Replay(ReplayArgs),
    /// Capture a prerecorded host event fixture into an artifact
    Record(RecordArgs),
    /// Summarize an artifact
    Inspect(InspectArgs),
    /// Pair baseline and current screenshots and compare them
    Compare(CompareArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Write screenshots to the baseline partition instead of current
    #[arg(long)]
    pub baseline: bool,

    /// Artifact to replay
    #[arg(short, long, default_value = "recorded-events.json")]
    pub events: PathBuf,

    /// Remote WebDriver endpoint
    #[arg(long, env = "RETRACE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Root of the screenshot partitions
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Stop at the first failed step
    #[arg(long)]
    pub strict: bool,

    /// Browser to request from the remote end
    #[arg(long)]
    pub browser: Option<String>,

    /// Print the replay report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    /// Capture fixture (`{url, title, nodes, events}`)
    pub fixture: PathBuf,

    /// Directory the artifact is written to
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,

    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Artifact to summarize
    pub file: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    /// Directory holding `baseline/` and `current/`
    #[arg(default_value = "screenshots")]
    pub root: PathBuf,

    /// Mismatch percentage above which a step is reported
    #[arg(long, default_value_t = 0.0)]
    pub threshold: f64,

    /// Print the comparison as JSON
    #[arg(long)]
    pub json: bool,
}
