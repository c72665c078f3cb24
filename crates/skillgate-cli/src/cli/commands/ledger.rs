//! `skillgate ledger` and `skillgate verify`.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use skillgate_core::{EntryStatus, LedgerEntry, LedgerStats, VerifyStatus};

use super::{Context, Outcome};
use crate::cli::args::{LedgerArgs, VerifyArgs};
use crate::output::{self, OutputFormat};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LedgerDump<'a> {
    entries: Vec<&'a LedgerEntry>,
    stats: LedgerStats,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "By")]
    approver: String,
    #[tabled(rename = "Score")]
    score: u32,
    #[tabled(rename = "Hash")]
    hash: String,
    #[tabled(rename = "Purpose")]
    purpose: String,
}

impl From<&LedgerEntry> for EntryRow {
    fn from(e: &LedgerEntry) -> Self {
        let status = match e.status {
            EntryStatus::Approved => e.status.to_string().green(),
            EntryStatus::Blocked => e.status.to_string().red(),
            EntryStatus::Revoked => e.status.to_string().yellow(),
        };
        Self {
            date: e.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            name: e.name.clone(),
            version: e.version.clone().unwrap_or_default(),
            status: status.to_string(),
            approver: e.approver.to_string(),
            score: e.score,
            hash: output::short_hash(&e.hash).to_string(),
            purpose: e.purpose.clone().unwrap_or_default(),
        }
    }
}

pub fn execute(ctx: &Context, args: LedgerArgs) -> Result<Outcome> {
    let ledger = ctx.ledger();
    if args.markdown {
        print!("{}", ledger.render_markdown());
        return Ok(Outcome::Success);
    }

    let entries: Vec<&LedgerEntry> = match &args.name {
        Some(name) => ledger.history(name),
        None => ledger.entries().iter().collect(),
    };
    let dump = LedgerDump {
        entries,
        stats: ledger.stats(),
    };
    if ctx.output.emit_structured(&dump)? {
        return Ok(Outcome::Success);
    }

    if ctx.output == OutputFormat::Compact {
        for e in &dump.entries {
            println!(
                "{} {} {} score={} hash={}",
                e.name,
                e.status,
                e.approver,
                e.score,
                output::short_hash(&e.hash)
            );
        }
        return Ok(Outcome::Success);
    }

    if dump.entries.is_empty() {
        println!("The ledger is empty.");
    } else {
        let rows: Vec<EntryRow> = dump.entries.iter().map(|e| EntryRow::from(*e)).collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
    let s = &dump.stats;
    println!(
        "{} entries for {} packages: {} approved, {} blocked, {} revoked",
        s.total, s.packages, s.approved, s.blocked, s.revoked
    );
    Ok(Outcome::Success)
}

pub fn execute_verify(ctx: &Context, args: VerifyArgs) -> Result<Outcome> {
    let outcome = ctx.gate()?.verify(&args.path)?;
    let matched = outcome.status == VerifyStatus::Match;

    if !ctx.output.emit_structured(&outcome)? {
        let label = outcome.status.to_string();
        if ctx.output == OutputFormat::Compact {
            println!("{} {label} hash={}", outcome.name, output::short_hash(&outcome.hash));
        } else {
            let colored_label = if matched { label.green().bold() } else { label.red().bold() };
            println!("{colored_label} {}", outcome.name.bold());
            println!("  {} {}", "Current hash:".bold(), outcome.hash);
            match &outcome.approved_entry {
                Some(entry) => println!("  {} {}", "Approved hash:".bold(), entry.hash),
                None => println!("  No approved ledger entry."),
            }
        }
    }
    Ok(Outcome::failed_if(!matched))
}
