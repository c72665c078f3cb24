use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::finding::Risk;

/// Status of a ledger record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Approved,
    Blocked,
    Revoked,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::Blocked => write!(f, "blocked"),
            Self::Revoked => write!(f, "revoked"),
        }
    }
}

/// Who made the decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Approver {
    Auto,
    Human,
}

impl fmt::Display for Approver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Human => write!(f, "human"),
        }
    }
}

/// One approve/block record.
///
/// Lookup identity is `(name, hash)`; `version` is advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    pub score: u32,
    pub risk: Risk,
    pub hash: String,
    /// Set by the ledger on append when absent
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    pub status: EntryStatus,
    pub approver: Approver,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub findings_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Answer to "is this package approved?"
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalStatus {
    /// Most recent entry for the name has status `approved`
    pub approved: bool,
    /// Most recent entry for the name, whatever its status
    pub entry: Option<LedgerEntry>,
    /// Only set when a hash was supplied and the entry is approved
    pub hash_match: Option<bool>,
}

/// Aggregate counts over the ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub total: usize,
    pub approved: usize,
    pub blocked: usize,
    pub revoked: usize,
    /// Distinct package names
    pub packages: usize,
}
