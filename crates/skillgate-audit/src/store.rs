//! Whole-file persistence for shared state files.
//!
//! The ledger, the watch state and the pending-review file are each read in
//! full, mutated in memory and written back in full. Two primitives make that
//! safe across concurrent invocations:
//!
//! - [`StateLock`]: an exclusive advisory lock (`flock`/`LockFileEx` via
//!   `fs2`) on a sibling `<file>.lock`, held for the whole read-modify-write
//!   cycle
//! - [`write_atomic`]: write to a temp file in the same directory, `sync_all`,
//!   then rename over the target

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use skillgate_core::{AuditError, Result};

/// Guard holding an exclusive lock for a state file.
///
/// Released when dropped.
#[derive(Debug)]
pub struct StateLock {
    file: File,
    path: PathBuf,
}

impl StateLock {
    /// Block until the lock for `target` is acquired.
    pub fn acquire(target: &Path) -> Result<Self> {
        let path = lock_path_for(target);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AuditError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| AuditError::io(&path, e))?;
        FileExt::lock_exclusive(&file).map_err(|source| AuditError::Lock {
            path: path.clone(),
            source,
        })?;
        debug!(lock = %path.display(), "acquired state lock");
        Ok(Self { file, path })
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!(lock = %self.path.display(), error = %e, "failed to release state lock");
        }
    }
}

fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    target.with_file_name(name)
}

/// Replace `path` with `bytes` atomically.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| AuditError::io(&dir, e))?;

    let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| AuditError::io(&dir, e))?;
    temp.write_all(bytes)
        .map_err(|e| AuditError::io(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| AuditError::io(temp.path(), e))?;
    temp.persist(path)
        .map_err(|e| AuditError::io(path, e.error))?;
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}

/// Read a state file, returning `None` if it is missing or unreadable.
pub fn read_optional(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "state file not found, starting fresh");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "state file unreadable, starting fresh");
            None
        }
    }
}

/// Load JSON state, degrading to `T::default()` when missing or corrupt.
pub fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let Some(text) = read_optional(path) else {
        return T::default();
    };
    serde_json::from_str(&text).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "state file corrupt, starting fresh");
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn atomic_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/state.json");
        write_json_atomic(&path, &vec![1, 2, 3]).unwrap();
        let back: Vec<u32> = load_json_or_default(&path);
        assert_eq!(back, vec![1, 2, 3]);
    }

    #[test]
    fn corrupt_json_loads_as_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        let loaded: BTreeMap<String, u32> = load_json_or_default(&path);
        assert!(loaded.is_empty());
    }

    #[test]
    fn missing_file_loads_as_default() {
        let dir = TempDir::new().unwrap();
        let loaded: Vec<String> = load_json_or_default(&dir.path().join("absent.json"));
        assert!(loaded.is_empty());
    }

    #[test]
    fn lock_file_sits_next_to_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("ledger.json");
        let lock = StateLock::acquire(&target).unwrap();
        assert_eq!(lock.path(), dir.path().join("ledger.json.lock"));
        drop(lock);
        // Re-acquiring after release must not block.
        let _again = StateLock::acquire(&target).unwrap();
    }
}
