use serde::{Deserialize, Serialize};

use super::finding::{Finding, Severity};

/// Separator used when a chain's files are flattened into a finding's `file`
pub const CHAIN_SEPARATOR: &str = "→";

/// Kind of cross-file capability flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainKind {
    /// Credential read in one file, network send in its importer
    CredentialExfiltration,
    /// Credential read, encoded by an importer, sent by a further importer
    EncodedExfiltration,
    /// Code execution in one file, network calls in its importer
    ExecWithNetwork,
}

impl ChainKind {
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::CredentialExfiltration | Self::EncodedExfiltration => Severity::Critical,
            Self::ExecWithNetwork => Severity::High,
        }
    }

    /// Rule id of the synthetic finding
    #[must_use]
    pub const fn rule_id(self) -> &'static str {
        match self {
            Self::CredentialExfiltration => "flow-credential-exfiltration",
            Self::EncodedExfiltration => "flow-encoded-exfiltration",
            Self::ExecWithNetwork => "flow-exec-network",
        }
    }
}

/// Ordered narrative of a detected cross-file flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowChain {
    pub kind: ChainKind,
    pub description: String,
    pub severity: Severity,
    /// Files in flow order, source first
    pub files: Vec<String>,
    pub steps: Vec<String>,
}

impl FlowChain {
    /// Stable identity of the chain, used to spot new chains across runs
    #[must_use]
    pub fn signature(&self) -> String {
        format!("{}:{}", self.kind.rule_id(), self.files.join(CHAIN_SEPARATOR))
    }

    /// Synthetic finding folded into the package score by the gate
    #[must_use]
    pub fn to_finding(&self) -> Finding {
        Finding {
            rule_id: self.kind.rule_id().to_string(),
            severity: self.severity,
            category: "flow".to_string(),
            file: self.files.join(CHAIN_SEPARATOR),
            line: 0,
            match_text: self.description.clone(),
            weight: self.severity.flow_weight(),
        }
    }
}

/// Output of the flow analyzer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowReport {
    pub chains: Vec<FlowChain>,
    pub findings: Vec<Finding>,
    pub files_analyzed: usize,
    pub edges: usize,
}

impl FlowReport {
    /// Total penalty of the synthetic findings
    #[must_use]
    pub fn penalty(&self) -> u32 {
        self.findings.iter().map(|f| f.weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_finding_joins_files() {
        let chain = FlowChain {
            kind: ChainKind::CredentialExfiltration,
            description: "credentials read in secrets.js are sent by send.js".into(),
            severity: Severity::Critical,
            files: vec!["secrets.js".into(), "send.js".into()],
            steps: vec![],
        };
        let finding = chain.to_finding();
        assert_eq!(finding.file, "secrets.js→send.js");
        assert_eq!(finding.line, 0);
        assert_eq!(finding.weight, 30);
        assert_eq!(
            chain.signature(),
            "flow-credential-exfiltration:secrets.js→send.js"
        );
    }
}
