use serde::{Deserialize, Serialize};
use std::fmt;

use super::diff::DiffResult;
use super::finding::{Finding, Risk};
use super::ledger::LedgerEntry;

/// Outcome of an install check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Allow,
    Review,
    Block,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "ALLOW"),
            Self::Review => write!(f, "REVIEW"),
            Self::Block => write!(f, "BLOCK"),
        }
    }
}

/// Full result of `Gate::check_install`.
///
/// A pure function of the current scan, the ledger and the policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateDecision {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    pub decision: Decision,
    /// Scanner score minus flow penalties, floored at 0
    pub score: u32,
    pub risk: Risk,
    pub findings: Vec<Finding>,
    pub flow_findings: Vec<Finding>,
    pub requires_approval: bool,
    pub hash: String,
    pub previously_approved: bool,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_result: Option<DiffResult>,
}

impl GateDecision {
    /// Total number of findings, rule and flow
    #[must_use]
    pub fn findings_count(&self) -> usize {
        self.findings.len() + self.flow_findings.len()
    }
}

/// Outcome of recomputing a package hash against the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerifyStatus {
    /// Hash equals the approved hash
    Match,
    /// Package is approved under a different hash
    Mismatch,
    /// No approved entry for the name
    NotApproved,
}

impl fmt::Display for VerifyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match => write!(f, "MATCH"),
            Self::Mismatch => write!(f, "MISMATCH"),
            Self::NotApproved => write!(f, "NOT APPROVED"),
        }
    }
}

/// Result of `Gate::verify`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOutcome {
    pub name: String,
    pub hash: String,
    pub status: VerifyStatus,
    pub approved_entry: Option<LedgerEntry>,
}
