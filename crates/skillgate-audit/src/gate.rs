//! Install decisions.
//!
//! ```text
//! fingerprint ──> ledger approved with same hash? ──yes──> ALLOW (no rescan)
//!                        │ no
//!                        v
//!               scanner + flow analyzer (+ diff vs installed copy)
//!                        │
//!                        v
//!   hash changed since approval ──> REVIEW
//!   adjusted < review threshold ──> BLOCK (auto ledger entry)
//!   require approval for all    ──> REVIEW
//!   adjusted >= auto allow      ──> ALLOW
//!   otherwise                   ──> REVIEW
//! ```

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use skillgate_core::{
    short_hash, Approver, Decision, EntryStatus, GateDecision, LedgerEntry, PackageFingerprint,
    Result, Risk, VerifyOutcome, VerifyStatus,
};

use crate::diff::DiffScanner;
use crate::discovery::{describe_package, locate_package};
use crate::flow::FlowAnalyzer;
use crate::hash::fingerprint;
use crate::ledger::Ledger;
use crate::policy::Policy;
use crate::scanner::{RuleSet, Scanner};

/// Caller-supplied context for an install check.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Overrides the manifest name
    pub name: Option<String>,
    /// Where the package came from, recorded on ledger entries
    pub source: Option<String>,
    /// Currently installed copy to diff the candidate against
    pub installed_path: Option<PathBuf>,
}

/// Decision engine over a policy, the analyzers and the ledger.
#[derive(Debug)]
pub struct Gate {
    policy: Policy,
    scanner: Scanner,
    flow: FlowAnalyzer,
    ledger: Ledger,
}

impl Gate {
    /// # Errors
    ///
    /// Returns [`skillgate_core::AuditError::InvalidPolicy`] for an
    /// inconsistent policy.
    pub fn new(policy: Policy, rules: RuleSet, ledger: Ledger) -> Result<Self> {
        policy.validate()?;
        Ok(Self {
            scanner: Scanner::new(rules, policy.max_file_size),
            flow: FlowAnalyzer::new(policy.max_file_size),
            policy,
            ledger,
        })
    }

    pub const fn policy(&self) -> &Policy {
        &self.policy
    }

    pub const fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    pub const fn flow(&self) -> &FlowAnalyzer {
        &self.flow
    }

    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    /// Decide whether the package at `path` may be installed.
    ///
    /// # Errors
    ///
    /// Fails when `path` holds no package, or when a BLOCK entry cannot be
    /// written to the ledger.
    pub fn check_install(&mut self, path: &Path, options: InstallOptions) -> Result<GateDecision> {
        let manifest = self.policy.manifest_file.clone();
        let root = locate_package(path, &manifest)?;
        let fp = fingerprint(&root);
        let info = describe_package(&root, &manifest);
        let name = options.name.unwrap_or(info.name);
        let version = info.version;

        self.ledger.reload();
        let approval = self.ledger.is_approved(&name, Some(&fp.hash));

        if approval.hash_match == Some(true) {
            if let Some(entry) = approval.entry {
                info!(name = %name, hash = %fp.short(), "previously approved, skipping scan");
                return Ok(GateDecision {
                    name,
                    version,
                    decision: Decision::Allow,
                    score: entry.score,
                    risk: entry.risk,
                    findings: Vec::new(),
                    flow_findings: Vec::new(),
                    requires_approval: false,
                    hash: fp.hash,
                    previously_approved: true,
                    reason: format!("previously approved {} (hash unchanged)", approval_date(&entry)),
                    diff_result: None,
                });
            }
        }

        let scan = self.scanner.scan(&root);
        let flow = if self.policy.enable_flow_analysis {
            self.flow.analyze(&root)
        } else {
            skillgate_core::FlowReport::default()
        };
        let adjusted = scan.score.saturating_sub(flow.penalty());
        debug!(name = %name, scanner = scan.score, flow_penalty = flow.penalty(), adjusted, "package scored");

        let diff_result = match &options.installed_path {
            Some(installed) if self.policy.enable_diff_scan && installed.is_dir() && installed != &root => {
                Some(DiffScanner::new(&self.scanner).diff(installed, &root))
            }
            _ => None,
        };

        let hash_changed = approval.approved && approval.hash_match == Some(false);
        let (decision, reason) = if hash_changed {
            let prior = approval.entry.as_ref().map_or("", |e| e.hash.as_str());
            (
                Decision::Review,
                format!(
                    "content changed since approval (approved {}, now {})",
                    short_hash(prior),
                    fp.short()
                ),
            )
        } else if adjusted < self.policy.review_threshold {
            (
                Decision::Block,
                format!(
                    "adjusted score {adjusted} is below the review threshold {}",
                    self.policy.review_threshold
                ),
            )
        } else if self.policy.require_approval_for_all {
            (
                Decision::Review,
                format!("policy requires approval for every install (score {adjusted})"),
            )
        } else if adjusted >= self.policy.auto_allow_threshold {
            (
                Decision::Allow,
                format!(
                    "score {adjusted} meets the auto-allow threshold {}",
                    self.policy.auto_allow_threshold
                ),
            )
        } else {
            (
                Decision::Review,
                format!(
                    "score {adjusted} is below the auto-allow threshold {}",
                    self.policy.auto_allow_threshold
                ),
            )
        };

        let result = GateDecision {
            name,
            version,
            decision,
            score: adjusted,
            risk: Risk::from_score(adjusted),
            findings: scan.findings,
            flow_findings: flow.findings,
            requires_approval: decision != Decision::Allow,
            hash: fp.hash.clone(),
            previously_approved: approval.approved,
            reason,
            diff_result,
        };

        if decision == Decision::Block {
            self.ledger.add(LedgerEntry {
                name: result.name.clone(),
                version: result.version.clone(),
                source: options.source,
                score: result.score,
                risk: result.risk,
                hash: fp.hash,
                date: None,
                status: EntryStatus::Blocked,
                approver: Approver::Auto,
                purpose: None,
                findings_count: Some(result.findings_count()),
                revoked_at: None,
            })?;
        }

        info!(name = %result.name, decision = %result.decision, score = result.score, "install checked");
        Ok(result)
    }

    /// Record a human approval from an earlier decision. Never rescans.
    ///
    /// # Errors
    ///
    /// Fails if the ledger cannot be written.
    pub fn approve(
        &mut self,
        prior: &GateDecision,
        purpose: Option<String>,
        source: Option<String>,
    ) -> Result<LedgerEntry> {
        self.ledger.add(LedgerEntry {
            name: prior.name.clone(),
            version: prior.version.clone(),
            source,
            score: prior.score,
            risk: prior.risk,
            hash: prior.hash.clone(),
            date: None,
            status: EntryStatus::Approved,
            approver: Approver::Human,
            purpose,
            findings_count: Some(prior.findings_count()),
            revoked_at: None,
        })
    }

    /// Recompute the package hash and compare it with the approved one.
    ///
    /// # Errors
    ///
    /// Fails when `path` holds no package.
    pub fn verify(&mut self, path: &Path) -> Result<VerifyOutcome> {
        let root = locate_package(path, &self.policy.manifest_file)?;
        let PackageFingerprint { hash, .. } = fingerprint(&root);
        let name = describe_package(&root, &self.policy.manifest_file).name;

        self.ledger.reload();
        let approval = self.ledger.is_approved(&name, Some(&hash));
        let status = match approval.hash_match {
            Some(true) => VerifyStatus::Match,
            Some(false) => VerifyStatus::Mismatch,
            None => VerifyStatus::NotApproved,
        };
        Ok(VerifyOutcome {
            name,
            hash,
            status,
            approved_entry: approval.entry.filter(|e| e.status == EntryStatus::Approved),
        })
    }
}

fn approval_date(entry: &LedgerEntry) -> String {
    let by = match entry.approver {
        Approver::Human => "by a reviewer",
        Approver::Auto => "automatically",
    };
    match entry.date {
        Some(date) => format!("{by} on {}", date.format("%Y-%m-%d")),
        None => by.to_string(),
    }
}
