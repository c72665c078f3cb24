//! `skillgate install` - gate a package and install it when allowed.

use anyhow::{bail, Context as _, Result};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use skillgate_audit::discovery::packages::is_safe_name;
use skillgate_audit::discovery::package_files;
use skillgate_audit::{describe_package, fingerprint, locate_package, InstallOptions};
use skillgate_core::{Decision, GateDecision};
use skillgate_hub::MaterializedSkill;

use super::{print_findings, Context, Outcome};
use crate::cli::args::InstallArgs;
use crate::output::{self, OutputFormat};

/// What happened after the gate decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
enum Action {
    Installed,
    AlreadyInstalled,
    DryRun,
    PendingReview,
    Blocked,
}

impl Action {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::AlreadyInstalled => "already-installed",
            Self::DryRun => "dry-run",
            Self::PendingReview => "pending-review",
            Self::Blocked => "blocked",
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InstallReport {
    #[serde(flatten)]
    decision: GateDecision,
    action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    installed_to: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

/// A target that is not an existing path but looks like one.
fn looks_like_path(target: &str) -> bool {
    target.contains(['/', '\\']) || target.starts_with('.') || target.starts_with('~')
}

pub async fn execute(ctx: &Context, args: InstallArgs) -> Result<Outcome> {
    let local = PathBuf::from(&args.target);
    let (fetched, source): (Option<MaterializedSkill>, String) = if local.exists() {
        (None, local.display().to_string())
    } else if looks_like_path(&args.target) {
        bail!("no such package directory: {}", args.target);
    } else {
        let skill = ctx
            .hub()?
            .fetch_skill(&args.target)
            .await
            .with_context(|| format!("cannot fetch '{}' from the hub", args.target))?;
        (Some(skill.materialize()?), format!("hub:{}", args.target))
    };
    let candidate = fetched.as_ref().map_or(local.as_path(), MaterializedSkill::root);

    let manifest = &ctx.policy().manifest_file;
    let root = locate_package(candidate, manifest)?;
    let name = args
        .name
        .unwrap_or_else(|| describe_package(&root, manifest).name);
    if !is_safe_name(&name) {
        bail!("'{name}' cannot be used as a package directory name");
    }

    let target_dir = ctx.paths.skills_dir.join(&name);
    let in_place = same_dir(&target_dir, &root);
    let installed_path = (target_dir.is_dir() && !in_place).then(|| target_dir.clone());

    let mut gate = ctx.gate()?;
    let decision = gate.check_install(
        &root,
        InstallOptions {
            name: Some(name),
            source: Some(source.clone()),
            installed_path,
        },
    )?;

    let (action, installed_to) = match decision.decision {
        Decision::Allow if args.dry_run => (Action::DryRun, None),
        Decision::Allow => {
            if in_place || (target_dir.is_dir() && fingerprint(&target_dir).hash == decision.hash) {
                (Action::AlreadyInstalled, Some(target_dir))
            } else {
                copy_package(&root, &target_dir)?;
                info!(name = %decision.name, to = %target_dir.display(), "package installed");
                (Action::Installed, Some(target_dir))
            }
        }
        Decision::Review => {
            ctx.pending()
                .record(decision.clone(), &root, Some(source.clone()))?;
            (Action::PendingReview, None)
        }
        Decision::Block => (Action::Blocked, None),
    };

    let blocked = decision.decision == Decision::Block;
    let report = InstallReport {
        decision,
        action,
        installed_to,
        source: Some(source),
    };
    render(ctx.output, &report)?;
    Ok(Outcome::failed_if(blocked))
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Copy the package's hashed files into `dest`, replacing any earlier copy.
///
/// Files are staged in a sibling directory and swapped in with a rename.
fn copy_package(root: &Path, dest: &Path) -> Result<()> {
    let parent = dest
        .parent()
        .context("skills directory has no parent")?;
    fs::create_dir_all(parent).with_context(|| format!("cannot create {}", parent.display()))?;

    let file_name = dest.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let staging = parent.join(format!(".{file_name}.staging"));
    if staging.exists() {
        fs::remove_dir_all(&staging)
            .with_context(|| format!("cannot clear {}", staging.display()))?;
    }

    for file in package_files(root) {
        let to = staging.join(&file.rel_path);
        if let Some(dir) = to.parent() {
            fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
        }
        fs::copy(&file.path, &to).with_context(|| format!("cannot copy {}", file.path.display()))?;
    }
    debug!(staging = %staging.display(), "package staged");

    if dest.exists() {
        fs::remove_dir_all(dest).with_context(|| format!("cannot replace {}", dest.display()))?;
    }
    fs::rename(&staging, dest).with_context(|| format!("cannot move package into {}", dest.display()))?;
    Ok(())
}

fn render(format: OutputFormat, report: &InstallReport) -> Result<()> {
    if format.emit_structured(report)? {
        return Ok(());
    }
    let d = &report.decision;
    if format == OutputFormat::Compact {
        println!(
            "{} {} score={} risk={} action={} hash={}",
            d.name,
            d.decision,
            d.score,
            d.risk,
            report.action.as_str(),
            output::short_hash(&d.hash)
        );
        return Ok(());
    }

    println!("{} {}", output::decision(d.decision), d.name.bold());
    println!("  {} {}/100 {}", "Score:".bold(), d.score, output::risk(d.risk));
    println!("  {} {}", "Reason:".bold(), d.reason);
    println!("  {} {}", "Hash:".bold(), output::short_hash(&d.hash));

    if !d.findings.is_empty() || !d.flow_findings.is_empty() {
        println!();
        println!("  {}", format!("Findings ({})", d.findings_count()).bold().underline());
        print_findings(&d.findings);
        print_findings(&d.flow_findings);
    }
    if let Some(diff) = &d.diff_result {
        println!();
        println!("  {} {}", "Changes vs installed:".bold(), diff.summary);
    }

    println!();
    match report.action {
        Action::Installed => println!(
            "Installed to {}",
            report.installed_to.as_deref().unwrap_or(Path::new("")).display()
        ),
        Action::AlreadyInstalled => println!("Already installed; nothing to copy."),
        Action::DryRun => println!("Dry run; nothing installed."),
        Action::PendingReview => println!(
            "Review required. Approve with: skillgate approve {} [purpose]",
            d.name
        ),
        Action::Blocked => println!("{}", "Blocked and recorded in the ledger.".red()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn path_like_targets() {
        assert!(looks_like_path("./pkg"));
        assert!(looks_like_path("skills/pkg"));
        assert!(looks_like_path("~/pkg"));
        assert!(!looks_like_path("weather"));
    }

    #[test]
    fn copy_preserves_hash_and_replaces_old_copy() {
        let src = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("lib")).unwrap();
        fs::write(src.path().join("SKILL.md"), "# p\n").unwrap();
        fs::write(src.path().join("lib/a.js"), "export {};\n").unwrap();

        let skills = TempDir::new().unwrap();
        let dest = skills.path().join("p");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale.js"), "old").unwrap();

        copy_package(src.path(), &dest).unwrap();
        assert!(!dest.join("stale.js").exists());
        assert_eq!(fingerprint(&dest).hash, fingerprint(src.path()).hash);
        assert!(!skills.path().join(".p.staging").exists());
    }
}
