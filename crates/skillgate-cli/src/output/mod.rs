//! Output formatting for different formats.

use anyhow::Result;
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use skillgate_core::{AlertSeverity, Decision, Risk, Severity};

pub use skillgate_core::short_hash;

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text with colors
    #[default]
    Pretty,
    /// One line per result
    Compact,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl OutputFormat {
    /// Serialize `value` for the structured formats.
    ///
    /// Returns `false` for `pretty` and `compact`, which every command
    /// renders itself.
    pub fn emit_structured<T: Serialize>(self, value: &T) -> Result<bool> {
        match self {
            Self::Json => println!("{}", serde_json::to_string_pretty(value)?),
            Self::Yaml => print!("{}", serde_yaml::to_string(value)?),
            Self::Pretty | Self::Compact => return Ok(false),
        }
        Ok(true)
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "compact" | "line" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => anyhow::bail!(
                "Unknown output format: {s}\n\
                 Valid formats: pretty, compact, json, yaml"
            ),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Compact => write!(f, "compact"),
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

pub fn risk(risk: Risk) -> ColoredString {
    let label = risk.to_string();
    match risk {
        Risk::Low => label.green(),
        Risk::Medium => label.yellow(),
        Risk::High => label.red(),
        Risk::Critical => label.red().bold(),
    }
}

pub fn decision(decision: Decision) -> ColoredString {
    let label = decision.to_string();
    match decision {
        Decision::Allow => label.green().bold(),
        Decision::Review => label.yellow().bold(),
        Decision::Block => label.red().bold(),
    }
}

pub fn severity(severity: Severity) -> ColoredString {
    let label = severity.as_str().to_uppercase();
    match severity {
        Severity::Low => label.dimmed(),
        Severity::Medium => label.yellow(),
        Severity::High => label.red(),
        Severity::Critical => label.red().bold(),
    }
}

pub fn alert_severity(severity: AlertSeverity) -> ColoredString {
    let label = severity.to_string().to_uppercase();
    match severity {
        AlertSeverity::Info => label.cyan(),
        AlertSeverity::Medium => label.yellow(),
        AlertSeverity::High => label.red(),
        AlertSeverity::Critical => label.red().bold(),
    }
}
