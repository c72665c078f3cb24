//! Drift detection across installed packages.
//!
//! One [`Watcher::run`] is a watch cycle: every installed package is
//! fingerprinted, compared with the state recorded by the previous cycle,
//! rescanned only when its hash moved, and the state file is rewritten.

use chrono::Utc;
use serde_json::json;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use skillgate_core::{
    short_hash, AlertKind, AlertSeverity, Result, WatchAlert, WatchReport, WatchState, WatchedSkill,
    WATCH_STATE_SCHEMA,
};

use crate::discovery::{describe_package, discover_packages};
use crate::flow::FlowAnalyzer;
use crate::hash::fingerprint;
use crate::ledger::Ledger;
use crate::policy::Policy;
use crate::scanner::{RuleSet, Scanner};
use crate::store::{load_json_or_default, write_json_atomic, StateLock};

/// Score drops larger than this raise `score_drop`.
pub const SCORE_DROP_ALERT: u32 = 10;
/// Score drops larger than this make `score_drop` critical.
pub const SCORE_DROP_CRITICAL: u32 = 30;
/// New packages scoring below this raise `new_findings`.
pub const NEW_SKILL_MIN_SCORE: u32 = 50;

/// Reconciles installed packages against the last watch cycle.
#[derive(Debug)]
pub struct Watcher {
    skills_dir: PathBuf,
    state_path: PathBuf,
    manifest: String,
    scanner: Scanner,
    flow: FlowAnalyzer,
    ledger: Ledger,
}

struct Scanned {
    score: u32,
    findings_count: usize,
    chains: Vec<String>,
}

impl Watcher {
    pub fn new(
        skills_dir: impl Into<PathBuf>,
        state_path: impl Into<PathBuf>,
        policy: &Policy,
        rules: RuleSet,
        ledger: Ledger,
    ) -> Self {
        Self {
            skills_dir: skills_dir.into(),
            state_path: state_path.into(),
            manifest: policy.manifest_file.clone(),
            scanner: Scanner::new(rules, policy.max_file_size),
            flow: FlowAnalyzer::new(policy.max_file_size),
            ledger,
        }
    }

    pub fn skills_dir(&self) -> &Path {
        &self.skills_dir
    }

    /// Current persisted state. Missing, corrupt or newer-schema state
    /// files read as empty.
    pub fn state(&self) -> WatchState {
        load_state(&self.state_path)
    }

    /// Run one watch cycle.
    ///
    /// # Errors
    ///
    /// Fails only if the state file cannot be locked or written.
    pub fn run(&mut self) -> Result<WatchReport> {
        let _lock = StateLock::acquire(&self.state_path)?;
        let mut state = load_state(&self.state_path);
        self.ledger.reload();

        let now = Utc::now();
        let packages = discover_packages(&self.skills_dir, &self.manifest);
        let mut alerts = Vec::new();
        let mut seen = BTreeSet::new();
        let mut clean = 0;

        for root in &packages {
            let name = describe_package(root, &self.manifest).name;
            if !seen.insert(name.clone()) {
                warn!(name = %name, path = %root.display(), "duplicate package name, skipping");
                continue;
            }
            let fp = fingerprint(root);
            let mut found = Vec::new();

            match state.skills.get(&name).cloned() {
                Some(prev) if prev.hash == fp.hash => {
                    debug!(name = %name, "unchanged");
                }
                Some(prev) => {
                    let now_scanned = self.scan(root);
                    found.push(alert(
                        AlertKind::Modified,
                        AlertSeverity::High,
                        &name,
                        format!("content changed ({} -> {})", short_hash(&prev.hash), fp.short()),
                        Some(json!({ "previousHash": prev.hash, "hash": fp.hash })),
                    ));

                    let delta = prev.score.saturating_sub(now_scanned.score);
                    if delta > SCORE_DROP_ALERT {
                        let severity = if delta > SCORE_DROP_CRITICAL {
                            AlertSeverity::Critical
                        } else {
                            AlertSeverity::High
                        };
                        found.push(alert(
                            AlertKind::ScoreDrop,
                            severity,
                            &name,
                            format!("score dropped {} -> {} ({delta} points)", prev.score, now_scanned.score),
                            Some(json!({ "previousScore": prev.score, "score": now_scanned.score, "drop": delta })),
                        ));
                    }

                    let known: BTreeSet<&String> = prev.flow_chains.iter().collect();
                    let new_chains: Vec<&String> =
                        now_scanned.chains.iter().filter(|c| !known.contains(c)).collect();
                    if !new_chains.is_empty() {
                        found.push(alert(
                            AlertKind::NewFindings,
                            AlertSeverity::Critical,
                            &name,
                            format!("{} new cross-file flow chain(s)", new_chains.len()),
                            Some(json!({ "chains": new_chains })),
                        ));
                    }

                    if self.ledger.is_approved(&name, Some(&fp.hash)).hash_match != Some(true) {
                        let message = match self.ledger.approved_hash(&name) {
                            Some(approved) => format!(
                                "current content {} is not the approved {}",
                                fp.short(),
                                short_hash(approved)
                            ),
                            None => format!("current content {} has no ledger approval", fp.short()),
                        };
                        found.push(alert(AlertKind::Unapproved, AlertSeverity::High, &name, message, None));
                    }

                    state.skills.insert(name.clone(), watched(&fp.hash, &now_scanned, now));
                }
                None => {
                    let first = self.scan(root);
                    found.push(alert(
                        AlertKind::NewSkill,
                        AlertSeverity::Info,
                        &name,
                        format!("first seen at {}", root.display()),
                        None,
                    ));
                    if self.ledger.is_approved(&name, Some(&fp.hash)).hash_match != Some(true) {
                        found.push(alert(
                            AlertKind::Unapproved,
                            AlertSeverity::High,
                            &name,
                            "installed without a matching ledger approval".to_string(),
                            None,
                        ));
                    }
                    if first.score < NEW_SKILL_MIN_SCORE {
                        found.push(alert(
                            AlertKind::NewFindings,
                            AlertSeverity::Critical,
                            &name,
                            format!("score {} with {} findings", first.score, first.findings_count),
                            Some(json!({ "score": first.score, "findings": first.findings_count })),
                        ));
                    }
                    state.skills.insert(name.clone(), watched(&fp.hash, &first, now));
                }
            }

            if found.iter().all(|a| a.severity == AlertSeverity::Info) {
                clean += 1;
            }
            alerts.extend(found);
        }

        let gone: Vec<String> = state
            .skills
            .keys()
            .filter(|name| !seen.contains(*name))
            .cloned()
            .collect();
        for name in gone {
            state.skills.remove(&name);
            alerts.push(alert(
                AlertKind::Removed,
                AlertSeverity::Info,
                &name,
                "no longer installed".to_string(),
                None,
            ));
        }

        state.schema_version = WATCH_STATE_SCHEMA;
        state.last_run_at = Some(now);
        write_json_atomic(&self.state_path, &state)?;

        info!(scanned = seen.len(), alerts = alerts.len(), clean, "watch cycle finished");
        Ok(WatchReport {
            alerts,
            scanned: seen.len(),
            clean,
            timestamp: now,
        })
    }

    fn scan(&self, root: &Path) -> Scanned {
        let report = self.scanner.scan(root);
        let flow = self.flow.analyze(root);
        Scanned {
            score: report.score,
            findings_count: report.findings.len(),
            chains: flow.chains.iter().map(skillgate_core::FlowChain::signature).collect(),
        }
    }
}

fn load_state(path: &Path) -> WatchState {
    let state: WatchState = load_json_or_default(path);
    if state.schema_version > WATCH_STATE_SCHEMA {
        warn!(
            path = %path.display(),
            schema_version = state.schema_version,
            "watch state written by a newer version, starting fresh"
        );
        return WatchState::default();
    }
    state
}

fn watched(hash: &str, scanned: &Scanned, now: chrono::DateTime<Utc>) -> WatchedSkill {
    WatchedSkill {
        hash: hash.to_string(),
        score: scanned.score,
        findings_count: scanned.findings_count,
        last_scanned_at: now,
        flow_chains: scanned.chains.clone(),
    }
}

fn alert(
    kind: AlertKind,
    severity: AlertSeverity,
    skill: &str,
    message: String,
    details: Option<serde_json::Value>,
) -> WatchAlert {
    WatchAlert {
        kind,
        severity,
        skill: skill.to_string(),
        message,
        details,
    }
}
