//! Install decisions awaiting a human.
//!
//! `install` records each REVIEW decision here so that a later `approve`
//! can write the ledger entry from that scan without rescanning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use skillgate_core::{GateDecision, Result};

use crate::store::{load_json_or_default, write_json_atomic, StateLock};

/// A REVIEW decision waiting for approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReview {
    pub decision: GateDecision,
    /// Package root that was scanned
    pub path: PathBuf,
    #[serde(default)]
    pub source: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingFile {
    #[serde(default)]
    reviews: BTreeMap<String, PendingReview>,
}

/// Pending-review store keyed by package name.
#[derive(Debug, Clone)]
pub struct PendingReviews {
    path: PathBuf,
}

impl PendingReviews {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store `decision`, replacing any earlier review for the same name.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be locked or written.
    pub fn record(&self, decision: GateDecision, path: &Path, source: Option<String>) -> Result<()> {
        let _lock = StateLock::acquire(&self.path)?;
        let mut file: PendingFile = load_json_or_default(&self.path);
        debug!(name = %decision.name, "recording pending review");
        file.reviews.insert(
            decision.name.clone(),
            PendingReview {
                decision,
                path: path.to_path_buf(),
                source,
                recorded_at: Utc::now(),
            },
        );
        write_json_atomic(&self.path, &file)
    }

    /// The pending review for `name`, if any.
    pub fn get(&self, name: &str) -> Option<PendingReview> {
        let file: PendingFile = load_json_or_default(&self.path);
        file.reviews.get(name).cloned()
    }

    /// Remove and return the pending review for `name`.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be locked or written.
    pub fn take(&self, name: &str) -> Result<Option<PendingReview>> {
        let _lock = StateLock::acquire(&self.path)?;
        let mut file: PendingFile = load_json_or_default(&self.path);
        let taken = file.reviews.remove(name);
        if taken.is_some() {
            write_json_atomic(&self.path, &file)?;
        }
        Ok(taken)
    }

    /// All pending reviews, by name.
    pub fn list(&self) -> Vec<PendingReview> {
        let file: PendingFile = load_json_or_default(&self.path);
        file.reviews.into_values().collect()
    }
}
