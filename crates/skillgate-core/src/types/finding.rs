use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a single finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Penalty applied to the package score for a synthetic flow finding
    #[must_use]
    pub const fn flow_weight(self) -> u32 {
        match self {
            Self::Critical => 30,
            Self::High => 20,
            Self::Medium => 10,
            Self::Low => 0,
        }
    }

    /// Contribution to the additive runtime risk score
    #[must_use]
    pub const fn runtime_weight(self) -> u32 {
        match self {
            Self::Critical => 30,
            Self::High => 15,
            Self::Medium => 5,
            Self::Low => 0,
        }
    }

    /// Lowercase label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk band derived from a 0..=100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Risk {
    Low,
    Medium,
    High,
    Critical,
}

impl Risk {
    /// Fixed bands: `>=80 LOW`, `>=50 MEDIUM`, `>=20 HIGH`, else `CRITICAL`
    #[must_use]
    pub const fn from_score(score: u32) -> Self {
        if score >= 80 {
            Self::Low
        } else if score >= 50 {
            Self::Medium
        } else if score >= 20 {
            Self::High
        } else {
            Self::Critical
        }
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// One rule match against scanned content.
///
/// Flow findings are synthetic: `file` is the ordered chain of files joined
/// by `→` and `line` is 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub rule_id: String,
    pub severity: Severity,
    pub category: String,
    /// Path relative to the package root
    pub file: String,
    /// 1-based line number, 0 for synthetic findings
    pub line: usize,
    pub match_text: String,
    pub weight: u32,
}

impl Finding {
    /// Identity used when comparing findings across two versions
    #[must_use]
    pub fn key(&self) -> (&str, &str, usize) {
        (self.rule_id.as_str(), self.file.as_str(), self.line)
    }
}

/// Result of running the rule engine over a package or a text blob
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// `max(0, 100 - sum of weights)`
    pub score: u32,
    pub risk: Risk,
    pub findings: Vec<Finding>,
    pub files_scanned: usize,
    pub files_skipped: usize,
    /// False when the scan was cancelled between files
    #[serde(default = "default_true")]
    pub complete: bool,
}

const fn default_true() -> bool {
    true
}

impl ScanReport {
    /// Build a report from findings, applying the subtractive score.
    ///
    /// Weights are summed across every finding with no deduplication, so two
    /// rules matching the same construct both count.
    #[must_use]
    pub fn from_findings(findings: Vec<Finding>, files_scanned: usize, files_skipped: usize) -> Self {
        let score = score_from_penalty(findings.iter().map(|f| f.weight));
        Self {
            score,
            risk: Risk::from_score(score),
            findings,
            files_scanned,
            files_skipped,
            complete: true,
        }
    }

    /// Count findings at each severity, most severe first
    #[must_use]
    pub fn severity_counts(&self) -> [(Severity, usize); 4] {
        let count = |s: Severity| self.findings.iter().filter(|f| f.severity == s).count();
        [
            (Severity::Critical, count(Severity::Critical)),
            (Severity::High, count(Severity::High)),
            (Severity::Medium, count(Severity::Medium)),
            (Severity::Low, count(Severity::Low)),
        ]
    }
}

/// `max(0, 100 - sum)` over a set of penalties
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn score_from_penalty(weights: impl IntoIterator<Item = u32>) -> u32 {
    let penalty: u64 = weights.into_iter().map(u64::from).sum();
    100u64.saturating_sub(penalty) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(rule: &str, weight: u32) -> Finding {
        Finding {
            rule_id: rule.into(),
            severity: Severity::High,
            category: "test".into(),
            file: "index.js".into(),
            line: 1,
            match_text: "eval(x)".into(),
            weight,
        }
    }

    #[test]
    fn risk_bands() {
        assert_eq!(Risk::from_score(100), Risk::Low);
        assert_eq!(Risk::from_score(80), Risk::Low);
        assert_eq!(Risk::from_score(79), Risk::Medium);
        assert_eq!(Risk::from_score(50), Risk::Medium);
        assert_eq!(Risk::from_score(49), Risk::High);
        assert_eq!(Risk::from_score(20), Risk::High);
        assert_eq!(Risk::from_score(19), Risk::Critical);
        assert_eq!(Risk::from_score(0), Risk::Critical);
    }

    #[test]
    fn empty_report_scores_100() {
        let report = ScanReport::from_findings(Vec::new(), 0, 0);
        assert_eq!(report.score, 100);
        assert_eq!(report.risk, Risk::Low);
    }

    #[test]
    fn score_floors_at_zero() {
        let findings = (0..10).map(|i| finding(&format!("r{i}"), 25)).collect();
        let report = ScanReport::from_findings(findings, 1, 0);
        assert_eq!(report.score, 0);
        assert_eq!(report.risk, Risk::Critical);
    }

    #[test]
    fn overlapping_findings_are_not_deduplicated() {
        // Two rules matching the same construct on the same line both count.
        let report = ScanReport::from_findings(vec![finding("eval", 20), finding("eval-call", 20)], 1, 0);
        assert_eq!(report.score, 60);
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
        assert_eq!(serde_json::to_string(&Risk::Medium).unwrap(), "\"MEDIUM\"");
    }

    #[test]
    fn flow_and_runtime_weights() {
        assert_eq!(Severity::Critical.flow_weight(), 30);
        assert_eq!(Severity::High.flow_weight(), 20);
        assert_eq!(Severity::Medium.flow_weight(), 10);
        assert_eq!(Severity::High.runtime_weight(), 15);
        assert_eq!(Severity::Medium.runtime_weight(), 5);
    }
}
