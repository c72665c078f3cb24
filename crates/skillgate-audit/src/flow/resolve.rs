//! Relative import specifier resolution.
//!
//! Specifiers are resolved against the importing file's directory inside the
//! package, trying in order: the exact path, the path with each known
//! extension appended, `<path>/index.<ext>`, and finally a `.js` → `.ts`
//! style swap for TypeScript sources compiled with `.js` specifiers.

use std::collections::BTreeSet;

/// Extensions tried when a specifier has none, in priority order.
pub const RESOLVE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "ts", "tsx", "jsx", "mts", "cts", "json"];

/// Emitted-extension to source-extension swaps.
const SOURCE_SWAPS: &[(&str, &str)] = &[
    (".js", ".ts"),
    (".js", ".tsx"),
    (".jsx", ".tsx"),
    (".mjs", ".mts"),
    (".cjs", ".cts"),
];

/// True for `./x`, `../x`, `.` and `..`.
pub fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Resolve `specifier` imported from `from` to a file in `files`.
///
/// Returns `None` for bare module names, specifiers escaping the package
/// root, and targets that match no file.
pub fn resolve_import(from: &str, specifier: &str, files: &BTreeSet<String>) -> Option<String> {
    if !is_relative(specifier) {
        return None;
    }
    let base = join(from, specifier)?;

    let mut candidates = Vec::new();
    if !base.is_empty() {
        candidates.push(base.clone());
        candidates.extend(RESOLVE_EXTENSIONS.iter().map(|ext| format!("{base}.{ext}")));
    }
    let dir_prefix = if base.is_empty() { String::new() } else { format!("{base}/") };
    candidates.extend(RESOLVE_EXTENSIONS.iter().map(|ext| format!("{dir_prefix}index.{ext}")));
    for (emitted, source) in SOURCE_SWAPS {
        if let Some(stem) = base.strip_suffix(emitted) {
            candidates.push(format!("{stem}{source}"));
        }
    }

    candidates.into_iter().find(|c| files.contains(c))
}

/// Join `specifier` onto the directory of `from`, normalizing `.` and `..`.
fn join(from: &str, specifier: &str) -> Option<String> {
    let mut parts: Vec<&str> = from.split('/').collect();
    parts.pop();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            s => parts.push(s),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| (*p).to_string()).collect()
    }

    #[test]
    fn resolution_matrix() {
        let tree = files(&[
            "index.js",
            "secrets.js",
            "lib/send.js",
            "lib/util/index.ts",
            "lib/data.json",
            "src/config.ts",
            "src/view.tsx",
            "pkg/index.mjs",
            "exact",
        ]);
        let cases: &[(&str, &str, Option<&str>)] = &[
            // exact path
            ("index.js", "./secrets.js", Some("secrets.js")),
            ("index.js", "./exact", Some("exact")),
            // missing extension
            ("index.js", "./secrets", Some("secrets.js")),
            ("index.js", "./lib/data", Some("lib/data.json")),
            // parent traversal
            ("lib/send.js", "../secrets", Some("secrets.js")),
            ("lib/util/index.ts", "../../secrets.js", Some("secrets.js")),
            ("lib/util/index.ts", "./../send", Some("lib/send.js")),
            // index fallback
            ("index.js", "./lib/util", Some("lib/util/index.ts")),
            ("lib/send.js", "./util/", Some("lib/util/index.ts")),
            ("index.js", "./pkg", Some("pkg/index.mjs")),
            ("lib/util/index.ts", "..", None),
            ("pkg/index.mjs", "..", Some("index.js")),
            ("pkg/index.mjs", ".", Some("pkg/index.mjs")),
            // TypeScript emitted-extension swap
            ("src/view.tsx", "./config.js", Some("src/config.ts")),
            ("src/config.ts", "./view.jsx", Some("src/view.tsx")),
            // escaping the package root
            ("index.js", "../outside", None),
            ("lib/send.js", "../../secrets", None),
            // bare module names and absolute paths
            ("index.js", "node-fetch", None),
            ("index.js", "/etc/passwd", None),
            ("index.js", "@scope/pkg", None),
            // no such file
            ("index.js", "./missing", None),
        ];
        for (from, spec, expected) in cases {
            assert_eq!(
                resolve_import(from, spec, &tree).as_deref(),
                *expected,
                "{from} imports {spec}"
            );
        }
    }

    #[test]
    fn exact_match_beats_inferred_extension() {
        let tree = files(&["a", "a.js"]);
        assert_eq!(resolve_import("x.js", "./a", &tree).as_deref(), Some("a"));
    }

    #[test]
    fn relative_detection() {
        assert!(is_relative("./a"));
        assert!(is_relative("../a"));
        assert!(is_relative(".."));
        assert!(!is_relative(".hidden"));
        assert!(!is_relative("fs"));
    }
}
