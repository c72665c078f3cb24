//! Heuristics for behavior that only matters once package code runs.
//!
//! Scored on its own additive axis (`critical=30, high=15, medium=5`, capped
//! at 100) and never folded into the scanner score. Two kinds of check:
//!
//! - line patterns, scoped by language, skipped on comment lines
//! - file correlations, where two capabilities in the same file together
//!   form the dangerous pattern (fetch + eval, timer + fetch, ...)

use regex::Regex;
use std::path::Path;
use tracing::debug;

use skillgate_core::{RuntimeFinding, RuntimeReport, Severity};

use crate::discovery::{package_files, read_text};

/// Language family a pattern applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lang {
    Js,
    Python,
    Shell,
}

const ALL: &[Lang] = &[Lang::Js, Lang::Python, Lang::Shell];
const JS: &[Lang] = &[Lang::Js];
const PY: &[Lang] = &[Lang::Python];
const SH: &[Lang] = &[Lang::Shell];

impl Lang {
    fn of(rel_path: &str, content: &str) -> Option<Self> {
        match crate::discovery::files::extension_of(rel_path).as_deref() {
            Some("js" | "mjs" | "cjs" | "ts" | "tsx" | "jsx" | "mts" | "cts") => Some(Self::Js),
            Some("py") => Some(Self::Python),
            Some("sh" | "bash" | "zsh") => Some(Self::Shell),
            None => {
                // Extensionless scripts are identified by their shebang.
                let shebang = content.lines().next()?.strip_prefix("#!")?;
                if shebang.contains("python") {
                    Some(Self::Python)
                } else if shebang.contains("node") {
                    Some(Self::Js)
                } else if shebang.contains("sh") {
                    Some(Self::Shell)
                } else {
                    None
                }
            }
            Some(_) => None,
        }
    }

    fn is_comment(self, line: &str) -> bool {
        let t = line.trim_start();
        match self {
            Self::Js => t.starts_with("//") || t.starts_with("/*") || t.starts_with('*'),
            Self::Python | Self::Shell => t.starts_with('#') && !t.starts_with("#!"),
        }
    }
}

struct LineSpec {
    kind: &'static str,
    severity: Severity,
    langs: &'static [Lang],
    pattern: &'static str,
    description: &'static str,
}

struct CorrelationSpec {
    kind: &'static str,
    severity: Severity,
    langs: &'static [Lang],
    first: &'static str,
    second: &'static str,
    description: &'static str,
}

const LINE_SPECS: &[LineSpec] = &[
    LineSpec {
        kind: "dynamic-import",
        severity: Severity::High,
        langs: JS,
        pattern: r#"\b(?:require|import)\s*\(\s*(?:[A-Za-z_$][\w$.]*\s*[,)+]|`[^`]*\$\{)"#,
        description: "module loaded from a computed specifier",
    },
    LineSpec {
        kind: "dynamic-import",
        severity: Severity::High,
        langs: PY,
        pattern: r#"(?:__import__|importlib\.import_module)\s*\(\s*[A-Za-z_]"#,
        description: "module loaded from a computed name",
    },
    LineSpec {
        kind: "runtime-install",
        severity: Severity::High,
        langs: ALL,
        pattern: r"\b(?:npm|pnpm|yarn|bun)\s+(?:i|install|add)\b|\bpip3?\s+install\b|\bnpx\s+-y\b",
        description: "installs packages while running",
    },
    LineSpec {
        kind: "time-bomb",
        severity: Severity::High,
        langs: JS,
        pattern: r"new\s+Date\(\)\s*[<>]=?\s*new\s+Date\(|Date\.now\(\)\s*[<>]=?\s*\d{12,}|getFullYear\(\)\s*(?:[<>]=?|===?)\s*20\d\d|\b(?:runCount|invocations|launchCount|callCount)\s*(?:[<>]=?|===?)\s*\d{2,}",
        description: "activation gated on a date or usage counter",
    },
    LineSpec {
        kind: "time-bomb",
        severity: Severity::High,
        langs: PY,
        pattern: r"(?:datetime\.(?:now|today|utcnow)\(\)|date\.today\(\))\s*[<>]=?\s*(?:datetime|date)\(|time\.time\(\)\s*[<>]=?\s*\d{9,}",
        description: "activation gated on a date",
    },
    LineSpec {
        kind: "sandbox-detection",
        severity: Severity::High,
        langs: ALL,
        pattern: r#"/proc/1/cgroup|/\.dockerenv|\bsystemd-detect-virt\b|\bVBoxService\b|process\.env\.(?:CI|GITHUB_ACTIONS|GITLAB_CI|JENKINS_URL|BUILDKITE|CIRCLECI|TRAVIS)\b|os\.environ(?:\.get)?[\[(]\s*['"](?:CI|GITHUB_ACTIONS|GITLAB_CI)['"]|\$\{?(?:CI|GITHUB_ACTIONS)\}?\s*(?:=|!)="#,
        description: "checks for a container, VM or CI environment",
    },
    LineSpec {
        kind: "self-modification",
        severity: Severity::Critical,
        langs: JS,
        pattern: r"\b(?:writeFile|writeFileSync|appendFile|appendFileSync|createWriteStream)\s*\([^)\n]*(?:__filename|__dirname|import\.meta\.url|package\.json|SKILL\.md|\.claude|\.openclaw|\.cursor|\.config/)",
        description: "writes to its own files or the host configuration",
    },
    LineSpec {
        kind: "self-modification",
        severity: Severity::Critical,
        langs: PY,
        pattern: r#"open\(\s*(?:__file__|[^)\n]*(?:SKILL\.md|\.claude|\.openclaw|\.config/))[^)\n]*,\s*['"][wa]"#,
        description: "writes to its own files or the host configuration",
    },
    LineSpec {
        kind: "websocket-channel",
        severity: Severity::Medium,
        langs: JS,
        pattern: r#"new\s+WebSocket\s*\(\s*['"`]wss?://"#,
        description: "opens a persistent WebSocket channel",
    },
    LineSpec {
        kind: "dns-channel",
        severity: Severity::High,
        langs: JS,
        pattern: r"dns\.(?:resolve\w*|lookup)\s*\(\s*(?:`[^`]*\$\{|[\w$.]+\s*\+)",
        description: "encodes data into DNS lookups",
    },
    LineSpec {
        kind: "dns-channel",
        severity: Severity::High,
        langs: PY,
        pattern: r"socket\.gethostbyname\s*\(\s*(?:f['\x22]|[\w.]+\s*\+)",
        description: "encodes data into DNS lookups",
    },
    LineSpec {
        kind: "remote-shell",
        severity: Severity::Critical,
        langs: ALL,
        pattern: r#"(?:curl|wget)\s[^|\n]*\|\s*(?:sudo\s+)?(?:ba|z|da)?sh\b|\beval\s+"?\$\(\s*(?:curl|wget)\b"#,
        description: "downloads and runs a remote script",
    },
    LineSpec {
        kind: "unsafe-deserialization",
        severity: Severity::High,
        langs: PY,
        pattern: r"\b(?:pickle|cPickle|dill|marshal)\.loads?\s*\(",
        description: "deserializes data that can execute code",
    },
    LineSpec {
        kind: "remote-eval",
        severity: Severity::Critical,
        langs: PY,
        pattern: r"(?:^|[^.\w])(?:exec|eval)\s*\(\s*(?:requests\.|urllib|urlopen|base64\.|[\w.]+\.(?:text|content)\b)",
        description: "executes code fetched or decoded at runtime",
    },
];

const NET_JS: &str = r#"\bfetch\s*\(|\baxios\b|\bhttps?\.(?:get|request)\s*\(|XMLHttpRequest|(?:require\(\s*|from\s+)['"](?:node-fetch|undici|got)['"]"#;
const NET_PY: &str = r"\b(?:requests\.(?:get|post)|urllib\.request|urlopen|http\.client|socket\.socket)\b";

const CORRELATION_SPECS: &[CorrelationSpec] = &[
    CorrelationSpec {
        kind: "remote-eval",
        severity: Severity::Critical,
        langs: JS,
        first: NET_JS,
        second: r"(?:^|[^.\w$])eval\s*\(|new\s+Function\s*\(|\bvm\.runIn\w+\s*\(",
        description: "fetches content and evaluates code in the same file",
    },
    CorrelationSpec {
        kind: "write-then-require",
        severity: Severity::Critical,
        langs: JS,
        first: r#"\b(?:writeFile|writeFileSync|createWriteStream)\s*\([^\n]*\.(?:c|m)?js\b"#,
        second: r"\b(?:require|import)\s*\(",
        description: "writes a script file and loads modules at runtime",
    },
    CorrelationSpec {
        kind: "beaconing",
        severity: Severity::High,
        langs: JS,
        first: r"\bsetInterval\s*\(",
        second: NET_JS,
        description: "makes network calls on a timer",
    },
    CorrelationSpec {
        kind: "network-exec",
        severity: Severity::Critical,
        langs: PY,
        first: NET_PY,
        second: r"(?:^|[^.\w])(?:exec|eval)\s*\(|\bpickle\.loads?\s*\(|\bmarshal\.loads\s*\(",
        description: "executes or deserializes data from the network",
    },
];

struct LinePattern {
    spec: &'static LineSpec,
    regex: Regex,
}

struct Correlation {
    spec: &'static CorrelationSpec,
    first: Regex,
    second: Regex,
}

/// Runtime-only risk detector.
pub struct RuntimeMonitor {
    lines: Vec<LinePattern>,
    correlations: Vec<Correlation>,
    max_file_size: u64,
}

impl std::fmt::Debug for RuntimeMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeMonitor")
            .field("line_patterns", &self.lines.len())
            .field("correlations", &self.correlations.len())
            .field("max_file_size", &self.max_file_size)
            .finish()
    }
}

impl RuntimeMonitor {
    pub fn new(max_file_size: u64) -> Self {
        let compile = |p: &str| Regex::new(p).expect("valid runtime pattern");
        Self {
            lines: LINE_SPECS
                .iter()
                .map(|spec| LinePattern {
                    spec,
                    regex: compile(spec.pattern),
                })
                .collect(),
            correlations: CORRELATION_SPECS
                .iter()
                .map(|spec| Correlation {
                    spec,
                    first: compile(spec.first),
                    second: compile(spec.second),
                })
                .collect(),
            max_file_size,
        }
    }

    /// Analyze every script file under `root`.
    pub fn analyze(&self, root: &Path) -> RuntimeReport {
        let mut findings = Vec::new();
        let mut analyzed = 0;
        for file in package_files(root) {
            let Some(content) = read_text(&file, self.max_file_size) else {
                continue;
            };
            let Some(lang) = Lang::of(&file.rel_path, &content) else {
                continue;
            };
            analyzed += 1;
            findings.extend(self.analyze_content(&file.rel_path, lang, &content));
        }
        debug!(root = %root.display(), files = analyzed, findings = findings.len(), "runtime analysis finished");
        RuntimeReport::from_findings(findings, analyzed)
    }

    fn analyze_content(&self, rel_path: &str, lang: Lang, content: &str) -> Vec<RuntimeFinding> {
        let mut findings = Vec::new();
        let mut code = String::with_capacity(content.len());

        for (idx, line) in content.lines().enumerate() {
            if lang.is_comment(line) {
                code.push('\n');
                continue;
            }
            code.push_str(line);
            code.push('\n');
            for pattern in self.lines.iter().filter(|p| p.spec.langs.contains(&lang)) {
                if let Some(m) = pattern.regex.find(line) {
                    findings.push(RuntimeFinding {
                        kind: pattern.spec.kind.to_string(),
                        severity: pattern.spec.severity,
                        file: rel_path.to_string(),
                        line: idx + 1,
                        pattern: m.as_str().trim().to_string(),
                        description: pattern.spec.description.to_string(),
                    });
                }
            }
        }

        for corr in self.correlations.iter().filter(|c| c.spec.langs.contains(&lang)) {
            let (Some(a), Some(b)) = (corr.first.find(&code), corr.second.find(&code)) else {
                continue;
            };
            findings.push(RuntimeFinding {
                kind: corr.spec.kind.to_string(),
                severity: corr.spec.severity,
                file: rel_path.to_string(),
                line: 0,
                pattern: format!("{} + {}", a.as_str().trim(), b.as_str().trim()),
                description: corr.spec.description.to_string(),
            });
        }
        findings
    }
}
