//! Command implementations.

pub mod approve;
pub mod diff;
pub mod install;
pub mod ledger;
pub mod policy;
pub mod runtime;
pub mod scan;
pub mod status;
pub mod watch;

use anyhow::{Context as _, Result};
use colored::Colorize;
use std::process::ExitCode;

use skillgate_audit::{Gate, Ledger, PendingReviews, Policy, RuleSet, Scanner};
use skillgate_core::{Finding, CHAIN_SEPARATOR};
use skillgate_hub::HubClient;

use crate::config::{Config, Paths};
use crate::output::{self, OutputFormat};

/// How a successful command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// BLOCK, risk over threshold or a verification mismatch
    PolicyFailure,
}

impl Outcome {
    pub const fn failed_if(failed: bool) -> Self {
        if failed {
            Self::PolicyFailure
        } else {
            Self::Success
        }
    }

    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Success => ExitCode::SUCCESS,
            Self::PolicyFailure => ExitCode::from(1),
        }
    }
}

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub paths: Paths,
    pub output: OutputFormat,
}

impl Context {
    pub fn new(config: Config, output: OutputFormat) -> Result<Self> {
        let paths = config.paths()?;
        Ok(Self {
            config,
            paths,
            output,
        })
    }

    pub const fn policy(&self) -> &Policy {
        &self.config.policy
    }

    /// Rules from `paths.rules`, or the built-in set.
    pub fn rules(&self) -> Result<RuleSet> {
        match &self.paths.rules {
            Some(path) => RuleSet::load(path)
                .with_context(|| format!("cannot load rules from {}", path.display())),
            None => Ok(RuleSet::builtin()?),
        }
    }

    pub fn scanner(&self) -> Result<Scanner> {
        Ok(Scanner::new(self.rules()?, self.policy().max_file_size))
    }

    pub fn ledger(&self) -> Ledger {
        Ledger::open(&self.paths.ledger, self.paths.ledger_markdown.clone())
    }

    pub fn gate(&self) -> Result<Gate> {
        Ok(Gate::new(self.policy().clone(), self.rules()?, self.ledger())?)
    }

    pub fn pending(&self) -> PendingReviews {
        PendingReviews::new(&self.paths.pending)
    }

    pub fn hub(&self) -> Result<HubClient> {
        let hub = &self.config.hub;
        Ok(HubClient::builder()
            .base_url(&hub.base_url)
            .timeout(std::time::Duration::from_secs(hub.timeout_secs))
            .build()?)
    }
}

/// Print findings as an indented list, most severe first.
pub fn print_findings(findings: &[Finding]) {
    let mut sorted: Vec<&Finding> = findings.iter().collect();
    sorted.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.key().cmp(&b.key())));
    for f in sorted {
        let location = if f.line == 0 {
            f.file.replace(CHAIN_SEPARATOR, " → ")
        } else {
            format!("{}:{}", f.file, f.line)
        };
        println!(
            "    {:<8} {} {} {}",
            output::severity(f.severity),
            f.rule_id.bold(),
            location.cyan(),
            f.match_text.dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_codes() {
        assert_eq!(Outcome::failed_if(false), Outcome::Success);
        assert_eq!(Outcome::failed_if(true), Outcome::PolicyFailure);
    }
}
