//! `skillgate scan`, `scan-hub`, `check` and `batch` - standalone scoring.

use anyhow::{bail, Context as _, Result};
use colored::Colorize;
use serde::Serialize;
use std::io::Read as _;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

use skillgate_audit::discovery::packages::subdirectories;
use skillgate_audit::{describe_package, fingerprint, locate_package, FlowAnalyzer, Scanner};
use skillgate_core::{Finding, FlowReport, Risk, ScanReport};

use super::{print_findings, Context, Outcome};
use crate::cli::args::{BatchArgs, CheckArgs, ScanArgs, ScanHubArgs};
use crate::output::{self, OutputFormat};

/// Scanner and flow results for one package.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub hash: String,
    pub file_count: usize,
    /// Rule engine score before flow penalties
    pub scanner_score: u32,
    pub score: u32,
    pub risk: Risk,
    pub findings: Vec<Finding>,
    pub flow: FlowReport,
    pub files_scanned: usize,
    pub files_skipped: usize,
    /// Score is at or above the block threshold
    pub passed: bool,
}

/// Score the package rooted at `root`.
pub fn assess(ctx: &Context, scanner: &Scanner, root: &Path, source: Option<String>) -> Assessment {
    let policy = ctx.policy();
    let info = describe_package(root, &policy.manifest_file);
    let fp = fingerprint(root);
    let report = scanner.scan(root);
    let flow = if policy.enable_flow_analysis {
        FlowAnalyzer::new(policy.max_file_size).analyze(root)
    } else {
        FlowReport::default()
    };
    let score = report.score.saturating_sub(flow.penalty());
    info!(name = %info.name, score, "package scanned");
    Assessment {
        name: info.name,
        version: info.version,
        path: root.to_path_buf(),
        source,
        hash: fp.hash,
        file_count: fp.file_count,
        scanner_score: report.score,
        score,
        risk: Risk::from_score(score),
        findings: report.findings,
        flow,
        files_scanned: report.files_scanned,
        files_skipped: report.files_skipped,
        passed: score >= policy.block_threshold,
    }
}

pub fn execute(ctx: &Context, args: ScanArgs) -> Result<Outcome> {
    let root = locate_package(&args.path, &ctx.policy().manifest_file)?;
    let scanner = ctx.scanner()?;
    let assessment = assess(ctx, &scanner, &root, None);
    render(ctx, &assessment)?;
    Ok(Outcome::failed_if(!assessment.passed))
}

pub async fn execute_hub(ctx: &Context, args: ScanHubArgs) -> Result<Outcome> {
    let skill = ctx
        .hub()?
        .fetch_skill(&args.id)
        .await
        .with_context(|| format!("cannot fetch '{}' from the hub", args.id))?;
    let local = skill.materialize()?;
    let scanner = ctx.scanner()?;
    let mut assessment = assess(ctx, &scanner, local.root(), Some(format!("hub:{}", args.id)));
    assessment.name.clone_from(&skill.name);
    if skill.version.is_some() {
        assessment.version = skill.version;
    }
    render(ctx, &assessment)?;
    Ok(Outcome::failed_if(!assessment.passed))
}

pub fn execute_check(ctx: &Context, args: CheckArgs) -> Result<Outcome> {
    let text = if args.text == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("cannot read stdin")?;
        buf
    } else {
        args.text
    };
    let report = ctx.scanner()?.scan_text(&text, "<input>");
    let passed = report.score >= ctx.policy().block_threshold;

    if !ctx.output.emit_structured(&report)? {
        render_check(ctx.output, &report, passed);
    }
    Ok(Outcome::failed_if(!passed))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchReport {
    packages: Vec<Assessment>,
    failed: usize,
}

#[derive(Tabled)]
struct BatchRow {
    #[tabled(rename = "Package")]
    name: String,
    #[tabled(rename = "Score")]
    score: u32,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Findings")]
    findings: usize,
    #[tabled(rename = "Chains")]
    chains: usize,
    #[tabled(rename = "Hash")]
    hash: String,
    #[tabled(rename = "Status")]
    status: String,
}

pub fn execute_batch(ctx: &Context, args: BatchArgs) -> Result<Outcome> {
    if !args.dir.is_dir() {
        bail!("not a directory: {}", args.dir.display());
    }
    let scanner = ctx.scanner()?;
    let packages: Vec<Assessment> = subdirectories(&args.dir)
        .iter()
        .map(|dir| assess(ctx, &scanner, dir, None))
        .collect();
    let failed = packages.iter().filter(|a| !a.passed).count();
    let report = BatchReport { packages, failed };

    if !ctx.output.emit_structured(&report)? {
        match ctx.output {
            OutputFormat::Compact => report.packages.iter().for_each(print_compact),
            _ => render_batch(ctx, &report),
        }
    }
    Ok(Outcome::failed_if(report.failed > 0))
}

fn render_batch(ctx: &Context, report: &BatchReport) {
    if report.packages.is_empty() {
        println!("No packages found.");
        return;
    }
    let rows: Vec<BatchRow> = report
        .packages
        .iter()
        .map(|a| BatchRow {
            name: a.name.clone(),
            score: a.score,
            risk: output::risk(a.risk).to_string(),
            findings: a.findings.len(),
            chains: a.flow.chains.len(),
            hash: output::short_hash(&a.hash).to_string(),
            status: pass_label(a.passed).to_string(),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!(
        "{} scanned, {} below the block threshold ({})",
        report.packages.len(),
        report.failed,
        ctx.policy().block_threshold
    );
}

fn render(ctx: &Context, a: &Assessment) -> Result<()> {
    if ctx.output.emit_structured(a)? {
        return Ok(());
    }
    if ctx.output == OutputFormat::Compact {
        print_compact(a);
        return Ok(());
    }

    let version = a.version.as_deref().map(|v| format!(" {v}")).unwrap_or_default();
    println!("{}{} {}", a.name.bold(), version, a.path.display().to_string().dimmed());
    if let Some(source) = &a.source {
        println!("  {} {}", "Source:".bold(), source);
    }
    let penalty = a.flow.penalty();
    let breakdown = if penalty > 0 {
        format!(" (rules {}, flow -{penalty})", a.scanner_score)
    } else {
        String::new()
    };
    println!("  {} {}/100 {}{}", "Score:".bold(), a.score, output::risk(a.risk), breakdown);
    println!(
        "  {} {} ({} files, {} skipped)",
        "Hash:".bold(),
        output::short_hash(&a.hash),
        a.file_count,
        a.files_skipped
    );

    if !a.findings.is_empty() {
        println!();
        println!("  {}", format!("Findings ({})", a.findings.len()).bold().underline());
        print_findings(&a.findings);
    }
    if !a.flow.chains.is_empty() {
        println!();
        println!("  {}", "Flow chains".bold().underline());
        for chain in &a.flow.chains {
            println!(
                "    {:<8} {}",
                output::severity(chain.severity),
                chain.files.join(" → ").cyan()
            );
            println!("             {}", chain.description);
        }
    }
    println!();
    println!("  {}", pass_label(a.passed));
    Ok(())
}

fn print_compact(a: &Assessment) {
    println!(
        "{} score={} risk={} findings={} chains={} hash={} {}",
        a.name,
        a.score,
        a.risk,
        a.findings.len(),
        a.flow.chains.len(),
        output::short_hash(&a.hash),
        if a.passed { "PASS" } else { "FAIL" }
    );
}

fn render_check(format: OutputFormat, report: &ScanReport, passed: bool) {
    if format == OutputFormat::Compact {
        println!(
            "score={} risk={} findings={} {}",
            report.score,
            report.risk,
            report.findings.len(),
            if passed { "PASS" } else { "FAIL" }
        );
        return;
    }
    println!("{} {}/100 {}", "Score:".bold(), report.score, output::risk(report.risk));
    if report.findings.is_empty() {
        println!("No rule matched.");
    } else {
        print_findings(&report.findings);
    }
}

fn pass_label(passed: bool) -> colored::ColoredString {
    if passed {
        "PASS".green().bold()
    } else {
        "FAIL".red().bold()
    }
}
