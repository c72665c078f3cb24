//! Per-file capability classification.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::scanner::LineIndex;

/// Heuristic capability a file exhibits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    ReadsCredentials,
    MakesNetworkCalls,
    EncodesData,
    ExecutesCode,
    WritesFiles,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadsCredentials => write!(f, "reads credentials"),
            Self::MakesNetworkCalls => write!(f, "makes network calls"),
            Self::EncodesData => write!(f, "encodes data"),
            Self::ExecutesCode => write!(f, "executes code"),
            Self::WritesFiles => write!(f, "writes files"),
        }
    }
}

/// First occurrence of a capability in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evidence {
    pub line: usize,
    pub text: String,
}

/// Capabilities found in one file, with evidence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    found: BTreeMap<Capability, Evidence>,
}

impl Capabilities {
    pub fn has(&self, capability: Capability) -> bool {
        self.found.contains_key(&capability)
    }

    pub fn evidence(&self, capability: Capability) -> Option<&Evidence> {
        self.found.get(&capability)
    }

    pub fn reads_credentials(&self) -> bool {
        self.has(Capability::ReadsCredentials)
    }

    pub fn makes_network_calls(&self) -> bool {
        self.has(Capability::MakesNetworkCalls)
    }

    pub fn encodes_data(&self) -> bool {
        self.has(Capability::EncodesData)
    }

    pub fn executes_code(&self) -> bool {
        self.has(Capability::ExecutesCode)
    }

    pub fn writes_files(&self) -> bool {
        self.has(Capability::WritesFiles)
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }

    /// Describe a capability as `file (evidence, line n)` for chain steps.
    pub fn describe(&self, file: &str, capability: Capability) -> String {
        match self.evidence(capability) {
            Some(e) => format!("{file} {capability}: `{}` (line {})", e.text, e.line),
            None => format!("{file} {capability}"),
        }
    }
}

/// One compiled pattern family per capability.
#[derive(Debug, Clone)]
pub struct CapabilityPatterns {
    families: Vec<(Capability, Regex)>,
}

impl Default for CapabilityPatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityPatterns {
    pub fn new() -> Self {
        let family = |cap: Capability, pattern: &str| {
            (cap, Regex::new(pattern).expect("valid capability pattern"))
        };
        Self {
            families: vec![
                family(
                    Capability::ReadsCredentials,
                    r#"process\.env(?:\.|\[\s*['"])[A-Za-z0-9_]*(?i:key|token|secret|passw|credential|auth)|\.ssh/|\.aws/|\.npmrc|\.netrc|\.git-credentials|\.docker/config|\.kube/config|['"/]\.env['"]|\bid_(?:rsa|ed25519|ecdsa)\b|(?i:keychain|keytar|wallet\.dat|seed phrase|mnemonic)"#,
                ),
                family(
                    Capability::MakesNetworkCalls,
                    r#"\bfetch\s*\(|\baxios\b|\bhttps?\.(?:request|get)\s*\(|(?:require\(\s*|from\s+)['"](?:node:)?(?:https?|net|dgram|tls|node-fetch|undici|got|superagent)['"]|XMLHttpRequest|new\s+WebSocket\b|\bnet\.(?:connect|createConnection)\s*\(|navigator\.sendBeacon|dns\.(?:resolve|lookup)\w*\s*\("#,
                ),
                family(
                    Capability::EncodesData,
                    r#"\bbtoa\s*\(|\.toString\(\s*['"](?:base64|base64url|hex)['"]\s*\)|encodeURIComponent\s*\(|\bcreateCipher(?:iv)?\s*\(|zlib\.(?:gzip|deflate)\w*\s*\(|\bescape\s*\("#,
                ),
                family(
                    Capability::ExecutesCode,
                    r#"(?:^|[^.\w$])eval\s*\(|new\s+Function\s*\(|child_process|(?:^|[^.\w$])(?:exec|execSync|execFile|execFileSync|spawn|spawnSync)\s*\(|\bvm\.(?:runIn\w+|Script)\b"#,
                ),
                family(
                    Capability::WritesFiles,
                    r#"\b(?:writeFile|writeFileSync|appendFile|appendFileSync|createWriteStream|copyFile|copyFileSync)\s*\(|fs\.(?:promises\.)?(?:writeFile|appendFile|rename|copyFile)\b"#,
                ),
            ],
        }
    }

    /// Classify one file's content.
    pub fn classify(&self, content: &str) -> Capabilities {
        let lines = LineIndex::new(content);
        let found = self
            .families
            .iter()
            .filter_map(|(cap, regex)| {
                regex.find(content).map(|m| {
                    let evidence = Evidence {
                        line: lines.line_of(m.start()),
                        text: m.as_str().trim().to_string(),
                    };
                    (*cap, evidence)
                })
            })
            .collect();
        Capabilities { found }
    }
}
