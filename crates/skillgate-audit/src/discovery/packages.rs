//! Package location and manifest metadata.

use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use skillgate_core::{AuditError, Result};

/// Manifest file that marks a directory as a package.
pub const DEFAULT_MANIFEST: &str = "SKILL.md";

/// Metadata read from the manifest's YAML front matter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestMeta {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
}

/// A located package with its resolved name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub root: PathBuf,
    /// Manifest name, or the directory name when the manifest has none
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
}

/// True if `dir` holds the manifest file.
pub fn is_package(dir: &Path, manifest: &str) -> bool {
    dir.join(manifest).is_file()
}

/// Resolve the package root for `path`.
///
/// Accepts the package directory itself, or a wrapper directory with exactly
/// one immediate subdirectory holding the manifest (an unpacked archive).
pub fn locate_package(path: &Path, manifest: &str) -> Result<PathBuf> {
    if is_package(path, manifest) {
        return Ok(path.to_path_buf());
    }
    let not_a_package = || AuditError::NotAPackage {
        path: path.to_path_buf(),
        manifest: manifest.to_string(),
    };
    if !path.is_dir() {
        return Err(not_a_package());
    }
    let nested: Vec<PathBuf> = subdirectories(path)
        .into_iter()
        .filter(|d| is_package(d, manifest))
        .collect();
    match nested.as_slice() {
        [only] => {
            debug!(path = %only.display(), "using nested package");
            Ok(only.clone())
        }
        _ => Err(not_a_package()),
    }
}

/// Find installed packages under `root`.
///
/// Immediate subdirectories holding the manifest are packages; a
/// subdirectory without one is searched one level deeper.
pub fn discover_packages(root: &Path, manifest: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for dir in subdirectories(root) {
        if is_package(&dir, manifest) {
            found.push(dir);
            continue;
        }
        found.extend(
            subdirectories(&dir)
                .into_iter()
                .filter(|d| is_package(d, manifest)),
        );
    }
    found
}

/// Sorted immediate subdirectories, skipping hidden ones.
pub fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(|e| e.path())
        .collect();
    dirs.sort();
    dirs
}

/// Read manifest metadata. A missing or malformed front matter yields empty
/// metadata rather than an error.
pub fn read_manifest(dir: &Path, manifest: &str) -> ManifestMeta {
    let path = dir.join(manifest);
    let Ok(text) = fs::read_to_string(&path) else {
        return ManifestMeta::default();
    };
    let Some(front) = front_matter(&text) else {
        return ManifestMeta::default();
    };
    match serde_yaml::from_str::<Value>(front) {
        Ok(value) => ManifestMeta {
            name: scalar(&value, "name"),
            version: scalar(&value, "version"),
            description: scalar(&value, "description"),
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unparsable manifest front matter");
            ManifestMeta::default()
        }
    }
}

/// Describe a package root: manifest metadata plus its resolved name.
pub fn describe_package(root: &Path, manifest: &str) -> PackageInfo {
    let meta = read_manifest(root, manifest);
    let name = meta
        .name
        .filter(|n| is_safe_name(n))
        .unwrap_or_else(|| dir_name(root));
    PackageInfo {
        root: root.to_path_buf(),
        name,
        version: meta.version,
        description: meta.description,
    }
}

/// Names are used as directory names when installing.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(&['/', '\\', '\0'][..])
        && name.len() <= 128
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "unnamed".to_string())
}

/// YAML between a leading `---` line and the next `---` line.
fn front_matter(text: &str) -> Option<&str> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rest = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some(&rest[..offset]);
        }
        offset += line.len();
    }
    None
}

fn scalar(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn package(root: &Path, rel: &str, manifest: &str) -> PathBuf {
        let dir = root.join(rel);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(DEFAULT_MANIFEST), manifest).unwrap();
        dir
    }

    #[test]
    fn reads_front_matter() {
        let dir = TempDir::new().unwrap();
        let pkg = package(
            dir.path(),
            "weather",
            "---\nname: weather-lookup\nversion: 1.2\ndescription: Forecasts\n---\n# Weather\n",
        );
        let info = describe_package(&pkg, DEFAULT_MANIFEST);
        assert_eq!(info.name, "weather-lookup");
        assert_eq!(info.version.as_deref(), Some("1.2"));
        assert_eq!(info.description.as_deref(), Some("Forecasts"));
    }

    #[test]
    fn name_falls_back_to_directory() {
        let dir = TempDir::new().unwrap();
        let pkg = package(dir.path(), "notes", "# Notes skill\n");
        assert_eq!(describe_package(&pkg, DEFAULT_MANIFEST).name, "notes");

        let bad = package(dir.path(), "evil", "---\nname: ../../etc\n---\n");
        assert_eq!(describe_package(&bad, DEFAULT_MANIFEST).name, "evil");
    }

    #[test]
    fn locate_accepts_single_nested_package() {
        let dir = TempDir::new().unwrap();
        package(dir.path(), "wrapper/inner", "# x\n");
        let found = locate_package(&dir.path().join("wrapper"), DEFAULT_MANIFEST).unwrap();
        assert!(found.ends_with("wrapper/inner"));
    }

    #[test]
    fn locate_rejects_non_package() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        let err = locate_package(&dir.path().join("empty"), DEFAULT_MANIFEST).unwrap_err();
        assert!(matches!(err, AuditError::NotAPackage { .. }));
        assert!(locate_package(&dir.path().join("missing"), DEFAULT_MANIFEST).is_err());
    }

    #[test]
    fn locate_rejects_ambiguous_wrapper() {
        let dir = TempDir::new().unwrap();
        package(dir.path(), "bundle/a", "# a\n");
        package(dir.path(), "bundle/b", "# b\n");
        assert!(locate_package(&dir.path().join("bundle"), DEFAULT_MANIFEST).is_err());
    }

    #[test]
    fn discovers_one_level_of_nesting() {
        let dir = TempDir::new().unwrap();
        package(dir.path(), "alpha", "# a\n");
        package(dir.path(), "group/beta", "# b\n");
        package(dir.path(), "group/deep/gamma/nested", "# too deep\n");
        fs::create_dir_all(dir.path().join("not-a-skill")).unwrap();
        let found = discover_packages(dir.path(), DEFAULT_MANIFEST);
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }
}
