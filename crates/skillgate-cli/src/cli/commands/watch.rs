//! `skillgate watch` - one drift check over the installed packages.

use anyhow::{bail, Result};
use colored::Colorize;

use skillgate_audit::Watcher;
use skillgate_core::AlertSeverity;

use super::{Context, Outcome};
use crate::cli::args::WatchArgs;
use crate::output::{self, OutputFormat};

/// Fails when any alert is high or critical.
pub fn execute(ctx: &Context, args: WatchArgs) -> Result<Outcome> {
    let dir = args.dir.unwrap_or_else(|| ctx.paths.skills_dir.clone());
    if !dir.is_dir() {
        bail!("skills directory not found: {}", dir.display());
    }
    let mut watcher = Watcher::new(
        dir,
        &ctx.paths.watch_state,
        ctx.policy(),
        ctx.rules()?,
        ctx.ledger(),
    );
    let report = watcher.run()?;
    let alarming = report.worst().is_some_and(|s| s >= AlertSeverity::High);

    if ctx.output.emit_structured(&report)? {
        return Ok(Outcome::failed_if(alarming));
    }
    if ctx.output == OutputFormat::Compact {
        for alert in &report.alerts {
            println!("{} {} {} {}", alert.severity, alert.kind, alert.skill, alert.message);
        }
        return Ok(Outcome::failed_if(alarming));
    }

    println!(
        "{} {} packages, {} clean",
        "Watch:".bold(),
        report.scanned,
        report.clean
    );
    if report.alerts.is_empty() {
        println!("  {}", "No alerts.".green());
    }
    for alert in &report.alerts {
        println!(
            "  {:<8} {:<12} {} {}",
            output::alert_severity(alert.severity),
            alert.kind.to_string(),
            alert.skill.bold(),
            alert.message
        );
    }
    Ok(Outcome::failed_if(alarming))
}
