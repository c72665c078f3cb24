//! Structural and security diff between two versions of a package.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

use skillgate_core::{DiffResult, Finding, SensitiveChange, SensitiveSignal};

use crate::discovery::{package_files, read_text, PackageFile};
use crate::hash::file_hashes;
use crate::scanner::Scanner;

const SIGNAL_PATTERNS: &[(SensitiveSignal, &str)] = &[
    (
        SensitiveSignal::NetworkCall,
        r#"\bfetch\s*\(|\baxios\b|\bhttps?\.(?:get|request)\s*\(|XMLHttpRequest|\bWebSocket\s*\(|\brequests\.(?:get|post|put)\s*\(|\burllib\b|\burlopen\s*\(|\b(?:curl|wget)\s"#,
    ),
    (
        SensitiveSignal::CredentialAccess,
        r"process\.env\b|os\.environ|\bgetenv\s*\(|\.ssh/|\.aws/|\.npmrc|\.netrc|(?i:keychain|keytar|wallet|credentials)",
    ),
    (
        SensitiveSignal::Exec,
        r"(?:^|[^.\w$])(?:eval|exec|execSync|spawn|spawnSync|execFile)\s*\(|new\s+Function\s*\(|child_process|\bsubprocess\.|\bos\.(?:system|popen)\s*\(",
    ),
    (
        SensitiveSignal::FileWrite,
        r#"\b(?:writeFile|writeFileSync|appendFile|appendFileSync|createWriteStream|copyFile|copyFileSync)\s*\(|\bopen\s*\([^)\n]*['"][wa]b?\+?['"]|\bwrite_text\s*\("#,
    ),
    (
        SensitiveSignal::Scheduling,
        r"\bsetInterval\s*\(|\bcrontab\b|\bnode-cron\b|\bschedule\.every\b|LaunchAgents|systemctl\s+(?:--user\s+)?enable|\bschtasks\b",
    ),
];

/// Compares an installed package with a candidate replacement.
#[derive(Debug, Clone)]
pub struct DiffScanner<'a> {
    scanner: &'a Scanner,
    signals: Vec<(SensitiveSignal, Regex)>,
}

impl<'a> DiffScanner<'a> {
    pub fn new(scanner: &'a Scanner) -> Self {
        let signals = SIGNAL_PATTERNS
            .iter()
            .map(|(signal, p)| (*signal, Regex::new(p).expect("valid sensitive-change pattern")))
            .collect();
        Self { scanner, signals }
    }

    /// Diff `old` against `new`.
    pub fn diff(&self, old: &Path, new: &Path) -> DiffResult {
        let old_hashes = file_hashes(old);
        let new_hashes = file_hashes(new);

        let mut result = DiffResult::default();
        let paths: BTreeSet<&String> = old_hashes.keys().chain(new_hashes.keys()).collect();
        for path in paths {
            match (old_hashes.get(path), new_hashes.get(path)) {
                (None, Some(_)) => result.added.push(path.clone()),
                (Some(_), None) => result.removed.push(path.clone()),
                (Some(a), Some(b)) if a == b => result.unchanged.push(path.clone()),
                _ => result.modified.push(path.clone()),
            }
        }

        let old_report = self.scanner.scan(old);
        let new_report = self.scanner.scan(new);
        result.new_findings = missing_from(&new_report.findings, &old_report.findings);
        result.removed_findings = missing_from(&old_report.findings, &new_report.findings);
        result.risk_delta = i64::from(old_report.score) - i64::from(new_report.score);

        result.sensitive_changes = self.sensitive_changes(old, new, &result);
        result.summary = summarize(&result);
        debug!(
            old = %old.display(),
            new = %new.display(),
            risk_delta = result.risk_delta,
            "diff finished"
        );
        result
    }

    /// Signals present in added or modified files that the old version of the
    /// same file did not have on any line.
    fn sensitive_changes(&self, old: &Path, new: &Path, result: &DiffResult) -> Vec<SensitiveChange> {
        let max = self.scanner.max_file_size();
        let old_files = by_path(old);
        let new_files = by_path(new);
        let mut changes = Vec::new();

        for rel in result.added.iter().chain(&result.modified) {
            let Some(new_text) = new_files.get(rel.as_str()).and_then(|f| read_text(f, max)) else {
                continue;
            };
            let old_text = old_files
                .get(rel.as_str())
                .and_then(|f| read_text(f, max))
                .unwrap_or_default();

            for (signal, regex) in &self.signals {
                let before: HashSet<&str> = old_text
                    .lines()
                    .filter(|l| regex.is_match(l))
                    .map(str::trim)
                    .collect();
                let first_new = new_text
                    .lines()
                    .enumerate()
                    .find(|(_, l)| regex.is_match(l) && !before.contains(l.trim()));
                if let Some((idx, _)) = first_new {
                    changes.push(SensitiveChange {
                        file: rel.clone(),
                        signal: *signal,
                        line: idx + 1,
                    });
                }
            }
        }
        changes
    }
}

fn by_path(root: &Path) -> BTreeMap<String, PackageFile> {
    package_files(root)
        .into_iter()
        .map(|f| (f.rel_path.clone(), f))
        .collect()
}

/// Findings in `a` whose `(rule, file, line)` key does not occur in `b`.
fn missing_from(a: &[Finding], b: &[Finding]) -> Vec<Finding> {
    let keys: HashSet<_> = b.iter().map(Finding::key).collect();
    a.iter().filter(|f| !keys.contains(&f.key())).cloned().collect()
}

fn summarize(result: &DiffResult) -> String {
    if result.is_identical() {
        return "no changes".to_string();
    }
    let mut out = format!(
        "{} added, {} removed, {} modified; {} new findings, {} resolved; risk delta {:+}",
        result.added.len(),
        result.removed.len(),
        result.modified.len(),
        result.new_findings.len(),
        result.removed_findings.len(),
        result.risk_delta,
    );
    if !result.sensitive_changes.is_empty() {
        let listed: Vec<String> = result
            .sensitive_changes
            .iter()
            .map(|c| format!("{} in {}:{}", c.signal, c.file, c.line))
            .collect();
        let _ = write!(out, "; new {}", listed.join(", "));
    }
    out
}
