//! Configuration management.
//!
//! ```toml
//! [policy]
//! auto_allow_threshold = 80
//! review_threshold = 50
//!
//! [paths]
//! skills_dir = "~/.agent/skills"
//! ledger = "~/.local/share/skillgate/ledger.json"
//!
//! [hub]
//! base_url = "https://hub.skillgate.dev"
//! timeout_secs = 30
//! ```

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use skillgate_audit::Policy;

/// CLI configuration, loaded once per run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub policy: Policy,
    pub paths: PathsConfig,
    pub hub: HubConfig,
}

/// Raw path settings; `~` and `$VAR` are expanded on resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory installed packages live in
    pub skills_dir: Option<String>,
    pub ledger: Option<String>,
    /// Markdown mirror of the ledger; an empty string disables it
    pub ledger_markdown: Option<String>,
    pub watch_state: Option<String>,
    pub pending: Option<String>,
    /// Rule file replacing the built-in rules
    pub rules: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            base_url: skillgate_hub::DEFAULT_BASE_URL.to_string(),
            timeout_secs: skillgate_hub::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

/// Fully resolved state file locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paths {
    pub skills_dir: PathBuf,
    pub ledger: PathBuf,
    pub ledger_markdown: Option<PathBuf>,
    pub watch_state: PathBuf,
    pub pending: PathBuf,
    pub rules: Option<PathBuf>,
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "skillgate", "skillgate")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

fn expand(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).with_context(|| format!("cannot expand path '{raw}'"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

impl Config {
    /// Default config file path.
    pub fn default_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Ok(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Parse TOML text and validate the policy section.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.policy.validate()?;
        Ok(config)
    }

    /// Resolve every state path, defaulting into the data directory.
    pub fn paths(&self) -> Result<Paths> {
        let p = &self.paths;
        let resolve = |raw: Option<&String>, default: &str| -> Result<PathBuf> {
            match raw {
                Some(raw) => expand(raw),
                None => Ok(project_dirs()?.data_dir().join(default)),
            }
        };

        let ledger = resolve(p.ledger.as_ref(), "ledger.json")?;
        let ledger_markdown = match p.ledger_markdown.as_deref() {
            Some("") => None,
            Some(raw) => Some(expand(raw)?),
            None => Some(ledger.with_extension("md")),
        };
        Ok(Paths {
            skills_dir: resolve(p.skills_dir.as_ref(), "skills")?,
            ledger_markdown,
            watch_state: resolve(p.watch_state.as_ref(), "watch-state.json")?,
            pending: resolve(p.pending.as_ref(), "pending.json")?,
            rules: p.rules.as_deref().map(expand).transpose()?,
            ledger,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections() {
        let config = Config::parse(
            r#"
            [policy]
            auto_allow_threshold = 90
            require_approval_for_all = true

            [paths]
            ledger = "/var/lib/skillgate/ledger.json"
            skills_dir = "/opt/skills"
            watch_state = "/var/lib/skillgate/state.json"
            pending = "/var/lib/skillgate/pending.json"

            [hub]
            base_url = "http://localhost:8080"
            "#,
        )
        .unwrap();
        assert_eq!(config.policy.auto_allow_threshold, 90);
        assert_eq!(config.policy.review_threshold, 50);
        assert!(config.policy.require_approval_for_all);
        assert_eq!(config.hub.base_url, "http://localhost:8080");
        assert_eq!(config.hub.timeout_secs, 30);

        let paths = config.paths().unwrap();
        assert_eq!(paths.skills_dir, PathBuf::from("/opt/skills"));
        assert_eq!(
            paths.ledger_markdown,
            Some(PathBuf::from("/var/lib/skillgate/ledger.md"))
        );
        assert_eq!(paths.rules, None);
    }

    #[test]
    fn empty_markdown_path_disables_mirror() {
        let config = Config::parse("[paths]\nledger = \"/x/l.json\"\nledger_markdown = \"\"\n").unwrap();
        assert_eq!(config.paths().unwrap().ledger_markdown, None);
    }

    #[test]
    fn rejects_inconsistent_policy() {
        let err = Config::parse("[policy]\nauto_allow_threshold = 40\nreview_threshold = 60\n");
        assert!(err.is_err());
    }

    #[test]
    fn unknown_file_is_an_error_when_explicit() {
        assert!(Config::load(Some(Path::new("/nonexistent/skillgate.toml"))).is_err());
    }
}
