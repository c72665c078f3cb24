//! `skillgate policy` - show the active thresholds.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use skillgate_audit::Policy;

use super::{Context, Outcome};
use crate::output::OutputFormat;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PolicyView<'a> {
    #[serde(flatten)]
    policy: &'a Policy,
    rules_version: String,
    rule_count: usize,
}

pub fn execute(ctx: &Context) -> Result<Outcome> {
    let rules = ctx.rules()?;
    let policy = ctx.policy();
    let view = PolicyView {
        policy,
        rules_version: rules.version().to_string(),
        rule_count: rules.len(),
    };
    if ctx.output.emit_structured(&view)? {
        return Ok(Outcome::Success);
    }

    if ctx.output == OutputFormat::Compact {
        println!(
            "auto_allow={} review={} block={} require_all={} flow={} diff={} rules={}",
            policy.auto_allow_threshold,
            policy.review_threshold,
            policy.block_threshold,
            policy.require_approval_for_all,
            policy.enable_flow_analysis,
            policy.enable_diff_scan,
            view.rules_version
        );
        return Ok(Outcome::Success);
    }

    println!("{}", "Policy".bold().underline());
    let rows: [(&str, String); 8] = [
        ("Auto-allow threshold", policy.auto_allow_threshold.to_string()),
        ("Review threshold", policy.review_threshold.to_string()),
        ("Block threshold", policy.block_threshold.to_string()),
        ("Require approval for all", policy.require_approval_for_all.to_string()),
        ("Flow analysis", on_off(policy.enable_flow_analysis)),
        ("Diff scan", on_off(policy.enable_diff_scan)),
        ("Max file size", format!("{} bytes", policy.max_file_size)),
        ("Manifest", policy.manifest_file.clone()),
    ];
    for (label, value) in rows {
        println!("  {:<26} {value}", format!("{label}:").bold());
    }
    println!("  {:<26} {} ({} rules)", "Rules:".bold(), view.rules_version, view.rule_count);
    Ok(Outcome::Success)
}

fn on_off(enabled: bool) -> String {
    let label = if enabled { "on" } else { "off" };
    label.to_string()
}
