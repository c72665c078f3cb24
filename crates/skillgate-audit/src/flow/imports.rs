//! Import statement extraction.
//!
//! Recognizes ES `import ... from`, `export ... from`, side-effect imports,
//! CommonJS `require()` (optionally destructured) and dynamic `import()`
//! with a string literal. Non-literal specifiers are not edges.

use regex::Regex;

use super::resolve::is_relative;
use crate::scanner::LineIndex;

/// One import statement found in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEdge {
    /// Importing file, relative to the package root
    pub from: String,
    /// Specifier as written
    pub to: String,
    /// Imported bindings, empty for namespace-less or side-effect imports
    pub symbols: Vec<String>,
    pub is_relative: bool,
    pub line: usize,
}

/// Compiled import patterns.
#[derive(Debug, Clone)]
pub struct ImportPatterns {
    es_from: Regex,
    side_effect: Regex,
    require: Regex,
    dynamic: Regex,
}

impl Default for ImportPatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportPatterns {
    pub fn new() -> Self {
        Self {
            es_from: Regex::new(
                r#"(?m)^\s*(?:import|export)\s+(?:type\s+)?(?P<clause>[\w$*{}\s,]+?)\s+from\s*['"](?P<spec>[^'"\n]+)['"]"#,
            )
            .expect("valid ES import pattern"),
            side_effect: Regex::new(r#"(?m)^\s*import\s*['"](?P<spec>[^'"\n]+)['"]"#)
                .expect("valid side-effect import pattern"),
            require: Regex::new(
                r#"(?:(?:const|let|var)\s+(?P<binding>\{[^}]*\}|[\w$]+)\s*=\s*)?\brequire\s*\(\s*['"](?P<spec>[^'"\n]+)['"]\s*\)"#,
            )
            .expect("valid require pattern"),
            dynamic: Regex::new(r#"\bimport\s*\(\s*['"](?P<spec>[^'"\n]+)['"]\s*\)"#)
                .expect("valid dynamic import pattern"),
        }
    }

    /// Every import edge in `content`, in source order.
    pub fn extract(&self, from: &str, content: &str) -> Vec<ImportEdge> {
        let lines = LineIndex::new(content);
        let mut found: Vec<(usize, String, Vec<String>)> = Vec::new();

        for caps in self.es_from.captures_iter(content) {
            let clause = caps.name("clause").map_or("", |m| m.as_str());
            found.push((start_of(&caps), caps["spec"].to_string(), clause_symbols(clause)));
        }
        for caps in self.side_effect.captures_iter(content) {
            found.push((start_of(&caps), caps["spec"].to_string(), Vec::new()));
        }
        for caps in self.require.captures_iter(content) {
            let symbols = caps.name("binding").map_or_else(Vec::new, |m| clause_symbols(m.as_str()));
            found.push((start_of(&caps), caps["spec"].to_string(), symbols));
        }
        for caps in self.dynamic.captures_iter(content) {
            found.push((start_of(&caps), caps["spec"].to_string(), Vec::new()));
        }

        found.sort_by_key(|(offset, _, _)| *offset);
        found
            .into_iter()
            .map(|(offset, to, symbols)| ImportEdge {
                from: from.to_string(),
                is_relative: is_relative(&to),
                to,
                symbols,
                line: lines.line_of(offset),
            })
            .collect()
    }
}

/// Offset of the first non-whitespace byte of a match.
fn start_of(caps: &regex::Captures<'_>) -> usize {
    caps.get(0).map_or(0, |m| {
        m.start() + (m.as_str().len() - m.as_str().trim_start().len())
    })
}

/// Binding names from an import clause or a destructuring pattern.
///
/// `a, { b as c, d }` yields `a, b, d`; `* as ns` yields `ns`.
fn clause_symbols(clause: &str) -> Vec<String> {
    clause
        .split(|c: char| c == ',' || c == '{' || c == '}')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|item| {
            if let Some(alias) = item.strip_prefix("* as ") {
                return Some(alias.trim().to_string());
            }
            let name = item
                .split(|c: char| c.is_whitespace() || c == ':')
                .next()
                .unwrap_or(item);
            (!name.is_empty() && name != "type").then(|| name.to_string())
        })
        .collect()
}
