//! `skillgate diff` - compare two versions of a package.

use anyhow::{bail, Result};
use colored::Colorize;

use skillgate_audit::DiffScanner;

use super::{print_findings, Context, Outcome};
use crate::cli::args::DiffArgs;
use crate::output::OutputFormat;

/// Fails when the new version brings new findings or sensitive changes.
pub fn execute(ctx: &Context, args: DiffArgs) -> Result<Outcome> {
    for dir in [&args.old, &args.new] {
        if !dir.is_dir() {
            bail!("not a directory: {}", dir.display());
        }
    }
    let scanner = ctx.scanner()?;
    let diff = DiffScanner::new(&scanner).diff(&args.old, &args.new);
    let riskier = !diff.new_findings.is_empty() || !diff.sensitive_changes.is_empty();

    if ctx.output.emit_structured(&diff)? {
        return Ok(Outcome::failed_if(riskier));
    }
    if ctx.output == OutputFormat::Compact {
        println!("{}", diff.summary);
        return Ok(Outcome::failed_if(riskier));
    }

    println!("{}", diff.summary.bold());
    for (label, files) in [
        ("added", &diff.added),
        ("removed", &diff.removed),
        ("modified", &diff.modified),
    ] {
        for file in files {
            println!("  {label:<9} {file}");
        }
    }
    if !diff.sensitive_changes.is_empty() {
        println!();
        println!("  {}", "Sensitive changes".bold().underline());
        for change in &diff.sensitive_changes {
            println!("    new {} in {}:{}", change.signal.to_string().red(), change.file, change.line);
        }
    }
    if !diff.new_findings.is_empty() {
        println!();
        println!("  {}", "New findings".bold().underline());
        print_findings(&diff.new_findings);
    }
    if !diff.removed_findings.is_empty() {
        println!();
        println!("  {}", "Resolved findings".bold().underline());
        print_findings(&diff.removed_findings);
    }
    println!();
    println!("  {} {:+}", "Risk delta:".bold(), diff.risk_delta);
    Ok(Outcome::failed_if(riskier))
}
