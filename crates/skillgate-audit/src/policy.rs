//! Decision thresholds and scan toggles.

use serde::{Deserialize, Serialize};

use skillgate_core::{AuditError, Result};

use crate::discovery::packages::is_safe_name;
use crate::discovery::DEFAULT_MANIFEST;
use crate::scanner::DEFAULT_MAX_FILE_SIZE;

/// Policy loaded once at start-up and fixed for the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Adjusted score at or above which a package is allowed without review
    pub auto_allow_threshold: u32,
    /// Adjusted score below which the gate blocks
    pub review_threshold: u32,
    /// Score below which standalone scans exit non-zero
    pub block_threshold: u32,
    pub require_approval_for_all: bool,
    pub enable_flow_analysis: bool,
    pub enable_diff_scan: bool,
    /// Files larger than this are skipped by every analyzer
    pub max_file_size: u64,
    pub manifest_file: String,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            auto_allow_threshold: 80,
            review_threshold: 50,
            block_threshold: 50,
            require_approval_for_all: false,
            enable_flow_analysis: true,
            enable_diff_scan: true,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            manifest_file: DEFAULT_MANIFEST.to_string(),
        }
    }
}

impl Policy {
    /// Every install needs a human, and only near-clean packages pass.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            auto_allow_threshold: 90,
            review_threshold: 70,
            block_threshold: 70,
            require_approval_for_all: true,
            ..Self::default()
        }
    }

    /// Reject inconsistent thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidPolicy`] naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("auto_allow_threshold", self.auto_allow_threshold),
            ("review_threshold", self.review_threshold),
            ("block_threshold", self.block_threshold),
        ] {
            if value > 100 {
                return Err(AuditError::InvalidPolicy(format!(
                    "{name} must be at most 100, got {value}"
                )));
            }
        }
        if self.review_threshold > self.auto_allow_threshold {
            return Err(AuditError::InvalidPolicy(format!(
                "review_threshold ({}) exceeds auto_allow_threshold ({})",
                self.review_threshold, self.auto_allow_threshold
            )));
        }
        if self.max_file_size == 0 {
            return Err(AuditError::InvalidPolicy("max_file_size must be positive".into()));
        }
        if !is_safe_name(&self.manifest_file) {
            return Err(AuditError::InvalidPolicy(format!(
                "manifest_file '{}' is not a plain file name",
                self.manifest_file
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let policy = Policy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.auto_allow_threshold, 80);
        assert_eq!(policy.review_threshold, 50);
        assert_eq!(policy.manifest_file, "SKILL.md");
        assert!(Policy::strict().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let policy = Policy {
            review_threshold: 90,
            auto_allow_threshold: 60,
            ..Policy::default()
        };
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("review_threshold (90)"));
    }

    #[test]
    fn rejects_out_of_range_and_bad_manifest() {
        let over = Policy {
            block_threshold: 101,
            ..Policy::default()
        };
        assert!(over.validate().is_err());
        let manifest = Policy {
            manifest_file: "../SKILL.md".into(),
            ..Policy::default()
        };
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let policy: Policy = toml::from_str("auto_allow_threshold = 85\nrequire_approval_for_all = true\n").unwrap();
        assert_eq!(policy.auto_allow_threshold, 85);
        assert!(policy.require_approval_for_all);
        assert_eq!(policy.review_threshold, 50);
    }
}
