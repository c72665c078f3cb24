//! `skillgate runtime` - runtime behavior patterns.

use anyhow::{bail, Result};
use colored::Colorize;

use skillgate_audit::RuntimeMonitor;

use super::{Context, Outcome};
use crate::cli::args::RuntimeArgs;
use crate::output::{self, OutputFormat};

/// Fails when the risk score exceeds `100 - block_threshold`.
pub fn execute(ctx: &Context, args: RuntimeArgs) -> Result<Outcome> {
    if !args.path.is_dir() {
        bail!("not a directory: {}", args.path.display());
    }
    let policy = ctx.policy();
    let report = RuntimeMonitor::new(policy.max_file_size).analyze(&args.path);
    let limit = 100u32.saturating_sub(policy.block_threshold);
    let exceeded = report.risk_score > limit;

    if ctx.output.emit_structured(&report)? {
        return Ok(Outcome::failed_if(exceeded));
    }
    if ctx.output == OutputFormat::Compact {
        println!(
            "risk={} findings={} files={} {}",
            report.risk_score,
            report.findings.len(),
            report.files_analyzed,
            if exceeded { "FAIL" } else { "PASS" }
        );
        return Ok(Outcome::failed_if(exceeded));
    }

    println!(
        "{} {}/100 ({} files analyzed, limit {limit})",
        "Runtime risk:".bold(),
        report.risk_score,
        report.files_analyzed
    );
    for f in &report.findings {
        let location = if f.line == 0 {
            f.file.clone()
        } else {
            format!("{}:{}", f.file, f.line)
        };
        println!(
            "  {:<8} {} {} {}",
            output::severity(f.severity),
            f.kind.bold(),
            location.cyan(),
            f.description.dimmed()
        );
    }
    Ok(Outcome::failed_if(exceeded))
}
