use serde::{Deserialize, Serialize};
use std::fmt;

use super::finding::Finding;

/// Kind of sensitive behavior introduced by a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SensitiveSignal {
    NetworkCall,
    CredentialAccess,
    Exec,
    FileWrite,
    Scheduling,
}

impl fmt::Display for SensitiveSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkCall => write!(f, "network call"),
            Self::CredentialAccess => write!(f, "credential access"),
            Self::Exec => write!(f, "code execution"),
            Self::FileWrite => write!(f, "file write"),
            Self::Scheduling => write!(f, "scheduling"),
        }
    }
}

/// A sensitive signal that appears in the new version of a file but not
/// in the old one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitiveChange {
    pub file: String,
    pub signal: SensitiveSignal,
    /// 1-based line of the first occurrence in the new file
    pub line: usize,
}

/// Structural and security diff between two package versions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
    pub unchanged: Vec<String>,
    pub new_findings: Vec<Finding>,
    pub removed_findings: Vec<Finding>,
    /// `old_score - new_score`; positive means the new version is riskier
    pub risk_delta: i64,
    pub sensitive_changes: Vec<SensitiveChange>,
    pub summary: String,
}

impl DiffResult {
    /// True when no file was added, removed or modified
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}
