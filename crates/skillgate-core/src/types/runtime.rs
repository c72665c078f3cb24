use serde::{Deserialize, Serialize};

use super::finding::Severity;

/// Maximum runtime risk score
pub const RUNTIME_SCORE_CAP: u32 = 100;

/// A pattern that only matters once the package code executes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeFinding {
    /// Pattern family, e.g. `remote-eval` or `time-bomb`
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub file: String,
    /// 1-based line, 0 for whole-file correlations
    pub line: usize,
    pub pattern: String,
    pub description: String,
}

/// Output of the runtime monitor.
///
/// `risk_score` is additive (higher is worse), unlike the scanner's score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeReport {
    pub findings: Vec<RuntimeFinding>,
    pub risk_score: u32,
    pub files_analyzed: usize,
}

impl RuntimeReport {
    /// Sum runtime weights, capped at [`RUNTIME_SCORE_CAP`]
    #[must_use]
    pub fn from_findings(findings: Vec<RuntimeFinding>, files_analyzed: usize) -> Self {
        let raw: u32 = findings.iter().map(|f| f.severity.runtime_weight()).sum();
        Self {
            risk_score: raw.min(RUNTIME_SCORE_CAP),
            findings,
            files_analyzed,
        }
    }

    #[must_use]
    pub fn has_critical(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Critical)
    }
}
