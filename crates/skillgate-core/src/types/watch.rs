use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Current on-disk schema of the watch state file
pub const WATCH_STATE_SCHEMA: u32 = 1;

/// Last observed state of one installed package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedSkill {
    pub hash: String,
    pub score: u32,
    pub findings_count: usize,
    pub last_scanned_at: DateTime<Utc>,
    /// Signatures of flow chains seen at the last scan
    #[serde(default)]
    pub flow_chains: Vec<String>,
}

/// State carried between watch cycles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchState {
    #[serde(default = "current_schema")]
    pub schema_version: u32,
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub skills: BTreeMap<String, WatchedSkill>,
}

const fn current_schema() -> u32 {
    WATCH_STATE_SCHEMA
}

impl Default for WatchState {
    fn default() -> Self {
        Self {
            schema_version: WATCH_STATE_SCHEMA,
            last_run_at: None,
            skills: BTreeMap::new(),
        }
    }
}

/// What a watch alert is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Modified,
    NewFindings,
    ScoreDrop,
    Unapproved,
    NewSkill,
    Removed,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Modified => write!(f, "modified"),
            Self::NewFindings => write!(f, "new_findings"),
            Self::ScoreDrop => write!(f, "score_drop"),
            Self::Unapproved => write!(f, "unapproved"),
            Self::NewSkill => write!(f, "new_skill"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// Severity scale of watch alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Medium,
    High,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchAlert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub skill: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Result of one watch cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchReport {
    pub alerts: Vec<WatchAlert>,
    /// Packages found on disk this cycle
    pub scanned: usize,
    /// Packages whose alerts, if any, were all informational
    pub clean: usize,
    pub timestamp: DateTime<Utc>,
}

impl WatchReport {
    /// Highest alert severity, if any alert fired
    #[must_use]
    pub fn worst(&self) -> Option<AlertSeverity> {
        self.alerts.iter().map(|a| a.severity).max()
    }
}
