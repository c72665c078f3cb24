//! Durable approval ledger.
//!
//! The JSON store is authoritative. Entries are appended or flipped to
//! `revoked`, never deleted. Every mutation reloads the store under the state
//! lock, applies the change and rewrites both the store and the Markdown
//! mirror atomically.
//!
//! A store declaring a newer schema reads as empty, and every write to it is
//! refused so entries from the newer version survive.

mod markdown;

pub use markdown::render_markdown;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use skillgate_core::{ApprovalStatus, AuditError, EntryStatus, LedgerEntry, LedgerStats, Result};

use crate::store::{read_optional, write_atomic, write_json_atomic, StateLock};

/// Current on-disk schema of the ledger store
pub const LEDGER_SCHEMA: u32 = 1;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRef<'a> {
    schema_version: u32,
    entries: &'a [LedgerEntry],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Stored {
    #[serde(rename_all = "camelCase")]
    Document {
        schema_version: u32,
        #[serde(default)]
        entries: Vec<LedgerEntry>,
    },
    Legacy(Vec<LedgerEntry>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaHeader {
    schema_version: Option<u32>,
}

struct Loaded {
    entries: Vec<LedgerEntry>,
    /// Schema version of a store this build must not overwrite
    newer_schema: Option<u32>,
}

impl Loaded {
    const fn current(entries: Vec<LedgerEntry>) -> Self {
        Self {
            entries,
            newer_schema: None,
        }
    }
}

/// Approval ledger backed by a JSON store and a Markdown mirror.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    markdown_path: Option<PathBuf>,
    entries: Vec<LedgerEntry>,
    newer_schema: Option<u32>,
}

impl Ledger {
    /// Open the ledger at `path`. A missing or corrupt store is an empty
    /// ledger.
    pub fn open(path: impl Into<PathBuf>, markdown_path: Option<PathBuf>) -> Self {
        let path = path.into();
        let loaded = load_entries(&path);
        Self {
            path,
            markdown_path,
            entries: loaded.entries,
            newer_schema: loaded.newer_schema,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn markdown_path(&self) -> Option<&Path> {
        self.markdown_path.as_deref()
    }

    /// Re-read the store, picking up writes by other processes.
    pub fn reload(&mut self) {
        let loaded = load_entries(&self.path);
        self.entries = loaded.entries;
        self.newer_schema = loaded.newer_schema;
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Most recent entry for `name`, whatever its status.
    pub fn latest(&self, name: &str) -> Option<&LedgerEntry> {
        self.entries.iter().rev().find(|e| e.name == name)
    }

    /// Whether the most recent entry for `name` is an approval.
    ///
    /// When `hash` is given and the package is approved, `hash_match` says
    /// whether the approved hash equals it.
    pub fn is_approved(&self, name: &str, hash: Option<&str>) -> ApprovalStatus {
        let entry = self.latest(name).cloned();
        let approved = entry.as_ref().is_some_and(|e| e.status == EntryStatus::Approved);
        let hash_match = match (&entry, hash) {
            (Some(e), Some(h)) if approved => Some(e.hash == h),
            _ => None,
        };
        ApprovalStatus {
            approved,
            entry,
            hash_match,
        }
    }

    /// Hash of the current approval for `name`, if approved.
    pub fn approved_hash(&self, name: &str) -> Option<&str> {
        self.latest(name)
            .filter(|e| e.status == EntryStatus::Approved)
            .map(|e| e.hash.as_str())
    }

    /// All entries for `name`, oldest first.
    pub fn history(&self, name: &str) -> Vec<&LedgerEntry> {
        self.entries.iter().filter(|e| e.name == name).collect()
    }

    pub fn stats(&self) -> LedgerStats {
        let count = |s: EntryStatus| self.entries.iter().filter(|e| e.status == s).count();
        LedgerStats {
            total: self.entries.len(),
            approved: count(EntryStatus::Approved),
            blocked: count(EntryStatus::Blocked),
            revoked: count(EntryStatus::Revoked),
            packages: self
                .entries
                .iter()
                .map(|e| e.name.as_str())
                .collect::<BTreeSet<_>>()
                .len(),
        }
    }

    /// Append an entry, stamping the date if absent, and persist.
    ///
    /// # Errors
    ///
    /// Fails if the lock cannot be taken or the store cannot be written.
    pub fn add(&mut self, mut entry: LedgerEntry) -> Result<LedgerEntry> {
        let _lock = StateLock::acquire(&self.path)?;
        self.reload();
        if entry.date.is_none() {
            entry.date = Some(Utc::now());
        }
        info!(name = %entry.name, status = %entry.status, approver = %entry.approver, "ledger entry added");
        self.entries.push(entry.clone());
        self.write_files()?;
        Ok(entry)
    }

    /// Flip the most recent approval for `name` to revoked.
    ///
    /// Returns `false` when there is no approved entry to revoke.
    ///
    /// # Errors
    ///
    /// Fails if the lock cannot be taken or the store cannot be written.
    pub fn revoke(&mut self, name: &str) -> Result<bool> {
        let _lock = StateLock::acquire(&self.path)?;
        self.reload();
        let Some(entry) = self
            .entries
            .iter_mut()
            .rev()
            .find(|e| e.name == name && e.status == EntryStatus::Approved)
        else {
            return Ok(false);
        };
        entry.status = EntryStatus::Revoked;
        entry.revoked_at = Some(Utc::now());
        info!(name, "ledger approval revoked");
        self.write_files()?;
        Ok(true)
    }

    /// Write the in-memory entries to the store and the mirror.
    ///
    /// # Errors
    ///
    /// Fails if the lock cannot be taken or either file cannot be written.
    pub fn save(&self) -> Result<()> {
        let _lock = StateLock::acquire(&self.path)?;
        self.write_files()
    }

    /// Markdown rendering of the current entries.
    pub fn render_markdown(&self) -> String {
        render_markdown(&self.entries)
    }

    /// Caller holds the state lock.
    fn write_files(&self) -> Result<()> {
        if let Some(found) = self.newer_schema {
            return Err(AuditError::NewerSchema {
                path: self.path.clone(),
                found,
                supported: LEDGER_SCHEMA,
            });
        }
        write_json_atomic(
            &self.path,
            &DocumentRef {
                schema_version: LEDGER_SCHEMA,
                entries: &self.entries,
            },
        )?;
        if let Some(md) = &self.markdown_path {
            write_atomic(md, render_markdown(&self.entries).as_bytes())?;
        }
        Ok(())
    }
}

fn load_entries(path: &Path) -> Loaded {
    let Some(text) = read_optional(path) else {
        return Loaded::current(Vec::new());
    };
    // Checked apart from the entries, whose shape a newer version may change.
    if let Ok(SchemaHeader {
        schema_version: Some(found),
    }) = serde_json::from_str::<SchemaHeader>(&text)
    {
        if found > LEDGER_SCHEMA {
            warn!(
                path = %path.display(),
                schema_version = found,
                supported = LEDGER_SCHEMA,
                "ledger written by a newer version, reading as empty and refusing writes"
            );
            return Loaded {
                entries: Vec::new(),
                newer_schema: Some(found),
            };
        }
    }
    match serde_json::from_str::<Stored>(&text) {
        Ok(Stored::Document {
            schema_version,
            entries,
        }) => {
            debug!(path = %path.display(), schema_version, entries = entries.len(), "ledger loaded");
            Loaded::current(entries)
        }
        Ok(Stored::Legacy(entries)) => Loaded::current(entries),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ledger store corrupt, treating as empty");
            Loaded::current(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillgate_core::{Approver, Risk};
    use std::fs;
    use tempfile::TempDir;

    fn entry(name: &str, hash: &str, status: EntryStatus) -> LedgerEntry {
        LedgerEntry {
            name: name.into(),
            version: None,
            source: Some("local".into()),
            score: 90,
            risk: Risk::Low,
            hash: hash.into(),
            date: None,
            status,
            approver: Approver::Human,
            purpose: None,
            findings_count: Some(0),
            revoked_at: None,
        }
    }

    fn ledger(dir: &TempDir) -> Ledger {
        Ledger::open(dir.path().join("ledger.json"), Some(dir.path().join("LEDGER.md")))
    }

    #[test]
    fn missing_or_corrupt_store_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(ledger(&dir).entries().is_empty());
        fs::write(dir.path().join("ledger.json"), "{not json").unwrap();
        assert!(ledger(&dir).entries().is_empty());
    }

    #[test]
    fn add_persists_store_and_mirror() {
        let dir = TempDir::new().unwrap();
        let mut l = ledger(&dir);
        let added = l.add(entry("weather", "h1", EntryStatus::Approved)).unwrap();
        assert!(added.date.is_some());

        let reopened = ledger(&dir);
        assert_eq!(reopened.entries().len(), 1);
        let raw = fs::read_to_string(dir.path().join("ledger.json")).unwrap();
        assert!(raw.contains("\"schemaVersion\": 1"));
        let md = fs::read_to_string(dir.path().join("LEDGER.md")).unwrap();
        assert!(md.contains("| weather |"));
    }

    #[test]
    fn most_recent_entry_wins() {
        let dir = TempDir::new().unwrap();
        let mut l = ledger(&dir);
        l.add(entry("x", "h1", EntryStatus::Approved)).unwrap();
        assert!(l.is_approved("x", None).approved);
        assert_eq!(l.is_approved("x", Some("h1")).hash_match, Some(true));
        assert_eq!(l.is_approved("x", Some("h2")).hash_match, Some(false));

        l.add(entry("x", "h2", EntryStatus::Blocked)).unwrap();
        let status = l.is_approved("x", Some("h2"));
        assert!(!status.approved);
        assert_eq!(status.hash_match, None);
        assert_eq!(status.entry.unwrap().status, EntryStatus::Blocked);
        assert_eq!(l.approved_hash("x"), None);
        assert_eq!(l.history("x").len(), 2);
    }

    #[test]
    fn unknown_name_is_not_approved() {
        let dir = TempDir::new().unwrap();
        let status = ledger(&dir).is_approved("nope", Some("h"));
        assert!(!status.approved);
        assert!(status.entry.is_none());
        assert!(status.hash_match.is_none());
    }

    #[test]
    fn revoke_flips_latest_approval() {
        let dir = TempDir::new().unwrap();
        let mut l = ledger(&dir);
        l.add(entry("x", "h1", EntryStatus::Approved)).unwrap();
        l.add(entry("x", "h2", EntryStatus::Approved)).unwrap();
        assert!(l.revoke("x").unwrap());

        let reopened = ledger(&dir);
        assert_eq!(reopened.entries()[0].status, EntryStatus::Approved);
        assert_eq!(reopened.entries()[1].status, EntryStatus::Revoked);
        assert!(reopened.entries()[1].revoked_at.is_some());
        assert!(!reopened.is_approved("x", None).approved);
        assert!(!l.revoke("missing").unwrap());
    }

    #[test]
    fn accepts_legacy_array_store() {
        let dir = TempDir::new().unwrap();
        let legacy = serde_json::to_string(&vec![entry("old", "h", EntryStatus::Approved)]).unwrap();
        fs::write(dir.path().join("ledger.json"), legacy).unwrap();
        assert_eq!(ledger(&dir).approved_hash("old"), Some("h"));
    }

    #[test]
    fn newer_schema_reads_empty_and_is_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("ledger.json");
        let newer = r#"{"schemaVersion": 99, "entries": [{"future": true}]}"#;
        fs::write(&store, newer).unwrap();

        let mut l = ledger(&dir);
        assert!(l.entries().is_empty());
        let err = l.add(entry("x", "h1", EntryStatus::Approved)).unwrap_err();
        assert!(matches!(err, AuditError::NewerSchema { found: 99, supported: 1, .. }));
        assert!(l.save().is_err());
        assert!(!l.revoke("x").unwrap());

        assert_eq!(fs::read_to_string(&store).unwrap(), newer);
        assert!(!dir.path().join("LEDGER.md").exists());
    }

    #[test]
    fn concurrent_writers_keep_both_entries() {
        let dir = TempDir::new().unwrap();
        let mut first = ledger(&dir);
        let mut second = ledger(&dir);
        first.add(entry("a", "h1", EntryStatus::Approved)).unwrap();
        // `second` was opened before the first write; add() reloads under the lock.
        second.add(entry("b", "h2", EntryStatus::Blocked)).unwrap();
        assert_eq!(ledger(&dir).entries().len(), 2);
    }

    #[test]
    fn stats_count_statuses_and_names() {
        let dir = TempDir::new().unwrap();
        let mut l = ledger(&dir);
        l.add(entry("a", "h1", EntryStatus::Approved)).unwrap();
        l.add(entry("a", "h2", EntryStatus::Blocked)).unwrap();
        l.add(entry("b", "h3", EntryStatus::Approved)).unwrap();
        l.revoke("b").unwrap();
        assert_eq!(
            l.stats(),
            LedgerStats {
                total: 3,
                approved: 1,
                blocked: 1,
                revoked: 1,
                packages: 2,
            }
        );
    }
}
