use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Errors that can surface from the integrity gate engine.
///
/// Unreadable files inside a package and corrupt state files are not errors;
/// they are skipped or treated as empty where they are read. What remains
/// here is either bad input from the caller or a failure to persist state.
#[derive(Error, Debug)]
pub enum AuditError {
    /// File system operation failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Target is not a package and holds no nested package
    #[error("not a package: {path} (no {manifest} found)")]
    NotAPackage {
        /// Path that was inspected
        path: PathBuf,
        /// Manifest file name that was looked for
        manifest: String,
    },

    /// Rule set could not be loaded
    #[error("invalid rule set: {0}")]
    InvalidRules(String),

    /// Policy thresholds are inconsistent
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// Manifest front matter could not be parsed
    #[error("invalid manifest {path}: {reason}")]
    Manifest {
        /// Manifest path
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Advisory lock on a state file could not be taken
    #[error("could not lock {path}: {source}")]
    Lock {
        /// Lock file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// State file was written by a newer version and must not be overwritten
    #[error("{path} has schema version {found}, this build writes {supported}; refusing to overwrite it")]
    NewerSchema {
        /// State file path
        path: PathBuf,
        /// Version declared by the file
        found: u32,
        /// Highest version this build understands
        supported: u32,
    },

    /// No pending review exists for a package
    #[error("no pending review for '{0}' (run install first)")]
    NoPendingReview(String),

    /// Operation was cancelled before it completed
    #[error("operation cancelled")]
    Cancelled,
}

impl AuditError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Returns true if the error is bad caller input rather than an
    /// environment failure
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::NotAPackage { .. }
                | Self::InvalidRules(_)
                | Self::InvalidPolicy(_)
                | Self::Manifest { .. }
                | Self::NoPendingReview(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_path() {
        let err = AuditError::io(
            "/tmp/skills/x",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/tmp/skills/x"));
        assert!(!err.is_input_error());
    }

    #[test]
    fn not_a_package_is_input_error() {
        let err = AuditError::NotAPackage {
            path: PathBuf::from("/tmp/x"),
            manifest: "SKILL.md".into(),
        };
        assert!(err.is_input_error());
        assert!(err.to_string().contains("SKILL.md"));
    }

    #[test]
    fn newer_schema_names_both_versions() {
        let err = AuditError::NewerSchema {
            path: PathBuf::from("/tmp/ledger.json"),
            found: 3,
            supported: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/ledger.json"));
        assert!(msg.contains("schema version 3"));
        assert!(!err.is_input_error());
    }
}
