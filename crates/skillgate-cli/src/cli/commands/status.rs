//! `skillgate status` - combined dashboard.

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use skillgate_audit::{Policy, Watcher};
use skillgate_core::LedgerStats;

use super::{Context, Outcome};
use crate::config::Paths;
use crate::output::OutputFormat;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WatchSummary {
    tracked: usize,
    last_run_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Status<'a> {
    ledger: LedgerStats,
    pending_reviews: usize,
    watch: WatchSummary,
    policy: &'a Policy,
    paths: &'a Paths,
}

pub fn execute(ctx: &Context) -> Result<Outcome> {
    let ledger = ctx.ledger();
    let state = Watcher::new(
        &ctx.paths.skills_dir,
        &ctx.paths.watch_state,
        ctx.policy(),
        ctx.rules()?,
        ctx.ledger(),
    )
    .state();

    let status = Status {
        ledger: ledger.stats(),
        pending_reviews: ctx.pending().list().len(),
        watch: WatchSummary {
            tracked: state.skills.len(),
            last_run_at: state.last_run_at,
        },
        policy: ctx.policy(),
        paths: &ctx.paths,
    };
    if ctx.output.emit_structured(&status)? {
        return Ok(Outcome::Success);
    }

    let last_run = status
        .watch
        .last_run_at
        .map_or_else(|| "never".to_string(), |t| t.format("%Y-%m-%d %H:%M UTC").to_string());
    let s = &status.ledger;
    if ctx.output == OutputFormat::Compact {
        println!(
            "approved={} blocked={} revoked={} pending={} tracked={} last_watch={}",
            s.approved, s.blocked, s.revoked, status.pending_reviews, status.watch.tracked, last_run
        );
        return Ok(Outcome::Success);
    }

    println!("{}", "Ledger".bold().underline());
    println!(
        "  {} approved, {} blocked, {} revoked ({} packages)",
        s.approved.to_string().green(),
        s.blocked.to_string().red(),
        s.revoked.to_string().yellow(),
        s.packages
    );
    println!("  {} pending review", status.pending_reviews);
    println!("{}", "Watch".bold().underline());
    println!("  {} packages tracked, last run {last_run}", status.watch.tracked);
    println!("  skills in {}", ctx.paths.skills_dir.display());
    let p = status.policy;
    println!("{}", "Policy".bold().underline());
    println!(
        "  allow >= {}, block < {}, exit threshold {}{}",
        p.auto_allow_threshold,
        p.review_threshold,
        p.block_threshold,
        if p.require_approval_for_all {
            ", approval required for all"
        } else {
            ""
        }
    );
    Ok(Outcome::Success)
}
