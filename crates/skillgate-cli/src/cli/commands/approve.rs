//! `skillgate approve` and `skillgate revoke` - human ledger decisions.

use anyhow::{bail, Result};
use colored::Colorize;

use skillgate_core::{AuditError, EntryStatus, LedgerEntry};

use super::{Context, Outcome};
use crate::cli::args::{ApproveArgs, RevokeArgs};
use crate::output::{self, OutputFormat};

/// Approve from the pending review left by `install`; never rescans.
pub fn execute(ctx: &Context, args: ApproveArgs) -> Result<Outcome> {
    let pending = ctx.pending();
    let review = pending
        .get(&args.name)
        .ok_or_else(|| AuditError::NoPendingReview(args.name.clone()))?;

    let mut gate = ctx.gate()?;
    let entry = gate.approve(&review.decision, args.purpose, review.source.clone())?;
    pending.take(&args.name)?;

    if !ctx.output.emit_structured(&entry)? {
        print_entry(ctx.output, "approved", &entry);
        if ctx.output == OutputFormat::Pretty {
            if let Some(source) = &review.source {
                println!("Install it with: skillgate install {source}");
            }
        }
    }
    Ok(Outcome::Success)
}

pub fn execute_revoke(ctx: &Context, args: RevokeArgs) -> Result<Outcome> {
    let mut ledger = ctx.ledger();
    if !ledger.revoke(&args.name)? {
        bail!("'{}' has no approved ledger entry to revoke", args.name);
    }
    let entry = ledger
        .history(&args.name)
        .into_iter()
        .filter(|e| e.status == EntryStatus::Revoked)
        .max_by_key(|e| e.revoked_at)
        .cloned();

    if !ctx.output.emit_structured(&entry)? {
        match &entry {
            Some(entry) => print_entry(ctx.output, "revoked", entry),
            None => println!("revoked {}", args.name),
        }
    }
    Ok(Outcome::Success)
}

fn print_entry(format: OutputFormat, verb: &str, entry: &LedgerEntry) {
    if format == OutputFormat::Compact {
        println!(
            "{verb} {} score={} hash={}",
            entry.name,
            entry.score,
            output::short_hash(&entry.hash)
        );
        return;
    }
    println!(
        "{} {} (score {}/100 {}, hash {})",
        verb.to_uppercase().green().bold(),
        entry.name.bold(),
        entry.score,
        output::risk(entry.risk),
        output::short_hash(&entry.hash)
    );
    if let Some(purpose) = &entry.purpose {
        println!("  {} {}", "Purpose:".bold(), purpose);
    }
}
