//! Lexical rule engine.
//!
//! Every rule is matched against every text file in a package; each match is
//! a [`Finding`]. The package score is `max(0, 100 - sum of weights)` over all
//! findings, with no deduplication of overlapping matches.

pub mod rules;

use std::path::Path;
use tracing::debug;

use skillgate_core::{Finding, ScanReport};

use crate::cancel::Cancellation;
use crate::discovery::{package_files, read_text};

pub use rules::{Rule, RuleSet, RuleSpec, DEFAULT_RULES};

/// Default ceiling on scanned file size (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Longest `match_text` kept on a finding, in characters.
const MATCH_TEXT_LIMIT: usize = 120;

/// Rule engine bound to one compiled rule set.
#[derive(Debug, Clone)]
pub struct Scanner {
    rules: RuleSet,
    max_file_size: u64,
}

impl Scanner {
    pub const fn new(rules: RuleSet, max_file_size: u64) -> Self {
        Self {
            rules,
            max_file_size,
        }
    }

    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub const fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Scan every file under `root`.
    ///
    /// Binary, oversized and unreadable files are counted as skipped.
    pub fn scan(&self, root: &Path) -> ScanReport {
        self.scan_cancellable(root, &Cancellation::new())
    }

    /// Scan, checking `cancel` between files.
    ///
    /// A cancelled scan keeps the findings gathered so far and is marked
    /// incomplete.
    pub fn scan_cancellable(&self, root: &Path, cancel: &Cancellation) -> ScanReport {
        let mut findings = Vec::new();
        let mut scanned = 0;
        let mut skipped = 0;
        let mut complete = true;

        for file in package_files(root) {
            if cancel.is_cancelled() {
                debug!(root = %root.display(), "scan cancelled");
                complete = false;
                break;
            }
            match read_text(&file, self.max_file_size) {
                Some(content) => {
                    findings.extend(self.scan_content(&file.rel_path, &content));
                    scanned += 1;
                }
                None => skipped += 1,
            }
        }

        debug!(
            root = %root.display(),
            files = scanned,
            skipped,
            findings = findings.len(),
            "scan finished"
        );
        let mut report = ScanReport::from_findings(findings, scanned, skipped);
        report.complete = complete;
        report
    }

    /// Match the rule set against a free-standing text blob.
    ///
    /// `label` stands in for the file name; extension-scoped rules apply
    /// when it carries a matching extension.
    pub fn scan_text(&self, text: &str, label: &str) -> ScanReport {
        ScanReport::from_findings(self.scan_content(label, text), 1, 0)
    }

    /// All rule matches in one file's content.
    pub fn scan_content(&self, rel_path: &str, content: &str) -> Vec<Finding> {
        let lines = LineIndex::new(content);
        let mut findings = Vec::new();
        for rule in self.rules.rules() {
            if !rule.applies_to(rel_path) {
                continue;
            }
            for m in rule.regex().find_iter(content) {
                if m.as_str().is_empty() {
                    continue;
                }
                findings.push(Finding {
                    rule_id: rule.spec.id.clone(),
                    severity: rule.spec.severity,
                    category: rule.spec.category.clone(),
                    file: rel_path.to_string(),
                    line: lines.line_of(m.start()),
                    match_text: clip(m.as_str()),
                    weight: rule.spec.weight,
                });
            }
        }
        findings
    }
}

/// Byte offsets of line starts, for offset to line-number lookups.
pub(crate) struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub(crate) fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    /// 1-based line containing byte `offset`
    pub(crate) fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }
}

fn clip(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(MATCH_TEXT_LIMIT) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
