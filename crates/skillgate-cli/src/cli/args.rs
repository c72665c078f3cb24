//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Integrity gate for agent skill packages
///
/// Scans packages for dangerous patterns, decides whether they may be
/// installed, keeps a ledger of approvals and watches installed packages
/// for drift.
///
/// Exit codes: 0 success, 1 policy failure (BLOCK, risk over threshold,
/// verification mismatch), 2 usage or fetch error.
#[derive(Parser, Debug)]
#[command(name = "skillgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: <config dir>/skillgate/config.toml)
    #[arg(short, long, env = "SKILLGATE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Use the strict policy preset
    #[arg(long, global = true)]
    pub strict: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a local package and score it
    Scan(ScanArgs),

    /// Fetch a package from the hub and scan it
    ScanHub(ScanHubArgs),

    /// Match the rules against a piece of text
    Check(CheckArgs),

    /// Scan every subdirectory of a directory as a package
    Batch(BatchArgs),

    /// Decide whether a package may be installed, and install it if allowed
    Install(InstallArgs),

    /// Approve a package that an install sent to review
    Approve(ApproveArgs),

    /// Revoke the current approval of a package
    Revoke(RevokeArgs),

    /// Show the ledger
    Ledger(LedgerArgs),

    /// Check a package's hash against its approved hash
    Verify(VerifyArgs),

    /// Compare two versions of a package
    Diff(DiffArgs),

    /// Show the active policy
    Policy,

    /// Check installed packages for drift
    Watch(WatchArgs),

    /// Look for runtime behavior patterns in a directory
    Runtime(RuntimeArgs),

    /// Summary of ledger, watch state and policy
    Status,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Package directory
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct ScanHubArgs {
    /// Skill id on the hub
    pub id: String,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Text to check, or "-" to read stdin
    pub text: String,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Directory whose subdirectories are packages
    pub dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Local package path, or a hub skill id
    pub target: String,

    /// Install under this name instead of the manifest name
    #[arg(long)]
    pub name: Option<String>,

    /// Decide only; do not copy into the skills directory
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct ApproveArgs {
    /// Package name from the pending review
    pub name: String,

    /// Why this package is needed
    pub purpose: Option<String>,
}

#[derive(Args, Debug)]
pub struct RevokeArgs {
    /// Package name
    pub name: String,
}

#[derive(Args, Debug)]
pub struct LedgerArgs {
    /// Only entries for this package
    #[arg(long)]
    pub name: Option<String>,

    /// Print the markdown rendering
    #[arg(long, conflicts_with = "name")]
    pub markdown: bool,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Package directory
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Old version
    pub old: PathBuf,

    /// New version
    pub new: PathBuf,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Skills directory (default: paths.skills_dir)
    pub dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RuntimeArgs {
    /// Directory to analyze
    pub path: PathBuf,
}
