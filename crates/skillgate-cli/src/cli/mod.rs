//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use skillgate_audit::Policy;

use crate::config::Config;
use commands::{Context, Outcome};

/// Run the CLI application.
pub async fn run() -> Result<Outcome> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.strict {
        config.policy = strict(config.policy);
    }
    let ctx = Context::new(config, cli.output.unwrap_or_default())?;

    match cli.command {
        Commands::Scan(args) => commands::scan::execute(&ctx, args),
        Commands::ScanHub(args) => commands::scan::execute_hub(&ctx, args).await,
        Commands::Check(args) => commands::scan::execute_check(&ctx, args),
        Commands::Batch(args) => commands::scan::execute_batch(&ctx, args),
        Commands::Install(args) => commands::install::execute(&ctx, args).await,
        Commands::Approve(args) => commands::approve::execute(&ctx, args),
        Commands::Revoke(args) => commands::approve::execute_revoke(&ctx, args),
        Commands::Ledger(args) => commands::ledger::execute(&ctx, args),
        Commands::Verify(args) => commands::ledger::execute_verify(&ctx, args),
        Commands::Diff(args) => commands::diff::execute(&ctx, args),
        Commands::Policy => commands::policy::execute(&ctx),
        Commands::Watch(args) => commands::watch::execute(&ctx, args),
        Commands::Runtime(args) => commands::runtime::execute(&ctx, args),
        Commands::Status => commands::status::execute(&ctx),
    }
}

/// Strict thresholds over the configured scan settings.
fn strict(configured: Policy) -> Policy {
    Policy {
        enable_flow_analysis: configured.enable_flow_analysis,
        enable_diff_scan: configured.enable_diff_scan,
        max_file_size: configured.max_file_size,
        manifest_file: configured.manifest_file,
        ..Policy::strict()
    }
}

/// Logs go to stderr so structured output on stdout stays parseable.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_keeps_scan_settings() {
        let configured = Policy {
            max_file_size: 4096,
            enable_flow_analysis: false,
            ..Policy::default()
        };
        let policy = strict(configured);
        assert_eq!(policy.auto_allow_threshold, 90);
        assert!(policy.require_approval_for_all);
        assert_eq!(policy.max_file_size, 4096);
        assert!(!policy.enable_flow_analysis);
        assert!(policy.validate().is_ok());
    }
}
