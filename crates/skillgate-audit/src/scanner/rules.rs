//! Rule set loading.
//!
//! Rules live in a versioned TOML document so they can be updated without a
//! rebuild:
//!
//! ```toml
//! version = "2026.10"
//!
//! [[rule]]
//! id = "exec-eval"
//! title = "eval() of dynamic input"
//! category = "code-execution"
//! severity = "high"
//! weight = 20
//! pattern = '\beval\s*\('
//! extensions = ["js", "ts"]
//! ```

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use skillgate_core::{AuditError, Result, Severity};

use crate::discovery::files::extension_of;

/// Rule set compiled into the binary.
pub const DEFAULT_RULES: &str = include_str!("../../rules/default.toml");

/// Upper bound on a compiled pattern, guarding against pathological rules.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// One rule as written in the rule file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub id: String,
    pub title: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub severity: Severity,
    pub weight: u32,
    pub pattern: String,
    #[serde(default)]
    pub case_insensitive: bool,
    /// Only files with these extensions are matched; empty means all files
    #[serde(default)]
    pub extensions: Vec<String>,
}

fn default_category() -> String {
    "general".to_string()
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    version: Option<String>,
    #[serde(default, rename = "rule")]
    rules: Vec<RuleSpec>,
}

/// A rule with its compiled pattern.
#[derive(Debug, Clone)]
pub struct Rule {
    pub spec: RuleSpec,
    regex: Regex,
}

impl Rule {
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Whether the rule should be matched against `rel_path`
    pub fn applies_to(&self, rel_path: &str) -> bool {
        if self.spec.extensions.is_empty() {
            return true;
        }
        extension_of(rel_path).is_some_and(|ext| {
            self.spec
                .extensions
                .iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        })
    }
}

/// A validated, compiled rule set.
#[derive(Debug, Clone)]
pub struct RuleSet {
    version: String,
    rules: Vec<Rule>,
}

impl RuleSet {
    /// The rule set shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_toml(DEFAULT_RULES)
    }

    /// Load a rule file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| AuditError::io(path, e))?;
        Self::from_toml(&text)
            .map_err(|e| AuditError::InvalidRules(format!("{}: {e}", path.display())))
    }

    /// Parse and compile a TOML rule document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let file: RuleFile =
            toml::from_str(text).map_err(|e| AuditError::InvalidRules(e.to_string()))?;
        Self::from_specs(file.version.unwrap_or_else(|| "unversioned".into()), file.rules)
    }

    /// Compile rule specs, rejecting duplicate ids and bad patterns.
    pub fn from_specs(version: impl Into<String>, specs: Vec<RuleSpec>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(specs.len());
        for spec in specs {
            if !seen.insert(spec.id.clone()) {
                return Err(AuditError::InvalidRules(format!("duplicate rule id '{}'", spec.id)));
            }
            let regex = RegexBuilder::new(&spec.pattern)
                .case_insensitive(spec.case_insensitive)
                .multi_line(true)
                .size_limit(REGEX_SIZE_LIMIT)
                .build()
                .map_err(|e| AuditError::InvalidRules(format!("rule '{}': {e}", spec.id)))?;
            rules.push(Rule { spec, regex });
        }
        Ok(Self {
            version: version.into(),
            rules,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_rules_compile() {
        let rules = RuleSet::builtin().unwrap();
        assert!(rules.len() > 20);
        assert_ne!(rules.version(), "unversioned");
    }

    #[test]
    fn rejects_duplicate_ids() {
        let text = r#"
[[rule]]
id = "a"
title = "A"
severity = "low"
weight = 1
pattern = "x"

[[rule]]
id = "a"
title = "A again"
severity = "low"
weight = 1
pattern = "y"
"#;
        let err = RuleSet::from_toml(text).unwrap_err();
        assert!(err.to_string().contains("duplicate rule id 'a'"));
    }

    #[test]
    fn rejects_invalid_regex() {
        let text = r#"
[[rule]]
id = "broken"
title = "Broken"
severity = "high"
weight = 10
pattern = "(unclosed"
"#;
        let err = RuleSet::from_toml(text).unwrap_err();
        assert!(matches!(err, AuditError::InvalidRules(_)));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn extension_filter() {
        let set = RuleSet::from_specs(
            "t",
            vec![RuleSpec {
                id: "py".into(),
                title: "Python only".into(),
                category: "general".into(),
                severity: Severity::Low,
                weight: 1,
                pattern: "pickle".into(),
                case_insensitive: false,
                extensions: vec![".py".into()],
            }],
        )
        .unwrap();
        let rule = &set.rules()[0];
        assert!(rule.applies_to("lib/load.py"));
        assert!(!rule.applies_to("lib/load.js"));
        assert!(!rule.applies_to("Makefile"));
    }
}
