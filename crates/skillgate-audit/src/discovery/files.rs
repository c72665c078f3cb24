//! Package file walk -- deterministic, skipping ephemeral content.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Directories never part of a package's identity.
pub const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "bower_components",
    "__pycache__",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
];

/// OS metadata files.
pub const EXCLUDED_FILES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

/// Compiled bytecode extensions.
const EXCLUDED_EXTENSIONS: &[&str] = &["pyc", "pyo"];

/// Bytes inspected for a NUL when deciding whether a file is binary.
const BINARY_SNIFF_LEN: usize = 8000;

/// A regular file inside a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFile {
    /// Path relative to the package root, `/`-separated
    pub rel_path: String,
    /// Absolute path on disk
    pub path: PathBuf,
    /// Size from metadata at walk time
    pub size: u64,
}

impl PackageFile {
    /// Lowercase extension, if any
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.rel_path)
    }
}

/// Lowercase extension of a relative path
pub fn extension_of(rel_path: &str) -> Option<String> {
    let name = rel_path.rsplit('/').next().unwrap_or(rel_path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// List every regular file under `root`, sorted by relative path.
///
/// Symlinks are not followed and are not listed. Entries that cannot be
/// read while walking are skipped.
pub fn package_files(root: &Path) -> Vec<PackageFile> {
    let mut files: Vec<PackageFile> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_excluded(e))
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                debug!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let rel_path = relative_path(root, e.path())?;
            let size = e.metadata().map(|m| m.len()).unwrap_or(0);
            Some(PackageFile {
                rel_path,
                path: e.into_path(),
                size,
            })
        })
        .collect();

    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    files
}

fn is_excluded(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if entry.file_type().is_dir() {
        return EXCLUDED_DIRS.contains(&name.as_ref());
    }
    if EXCLUDED_FILES.contains(&name.as_ref()) || name.starts_with("._") {
        return true;
    }
    extension_of(&name).is_some_and(|ext| EXCLUDED_EXTENSIONS.contains(&ext.as_str()))
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Read a file as text for pattern matching.
///
/// Returns `None` for files over `max_size`, binary files (NUL in the first
/// 8000 bytes) and unreadable files. Invalid UTF-8 is decoded lossily.
pub fn read_text(file: &PackageFile, max_size: u64) -> Option<String> {
    if file.size > max_size {
        debug!(path = %file.rel_path, size = file.size, "skipping oversized file");
        return None;
    }
    let bytes = match fs::read(&file.path) {
        Ok(b) => b,
        Err(e) => {
            debug!(path = %file.rel_path, error = %e, "skipping unreadable file");
            return None;
        }
    };
    if bytes.len() as u64 > max_size {
        return None;
    }
    if bytes.iter().take(BINARY_SNIFF_LEN).any(|&b| b == 0) {
        debug!(path = %file.rel_path, "skipping binary file");
        return None;
    }
    Some(match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn lists_sorted_relative_paths() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.js", b"b");
        write(dir.path(), "a/z.js", b"z");
        write(dir.path(), "a/b.js", b"ab");
        let rels: Vec<_> = package_files(dir.path()).into_iter().map(|f| f.rel_path).collect();
        assert_eq!(rels, vec!["a/b.js", "a/z.js", "b.js"]);
    }

    #[test]
    fn skips_ephemeral_content() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "index.js", b"x");
        write(dir.path(), ".git/HEAD", b"ref");
        write(dir.path(), "node_modules/left-pad/index.js", b"x");
        write(dir.path(), "lib/__pycache__/m.cpython-311.pyc", b"x");
        write(dir.path(), "tool.pyc", b"x");
        write(dir.path(), ".DS_Store", b"x");
        write(dir.path(), ".venv/bin/python", b"x");
        let rels: Vec<_> = package_files(dir.path()).into_iter().map(|f| f.rel_path).collect();
        assert_eq!(rels, vec!["index.js"]);
    }

    #[test]
    fn read_text_skips_binary_and_oversized() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "bin.dat", &[0x7f, 0x45, 0x00, 0x01]);
        write(dir.path(), "big.js", &[b'a'; 64]);
        write(dir.path(), "ok.js", b"const a = 1;");
        let files = package_files(dir.path());
        let by_name = |n: &str| files.iter().find(|f| f.rel_path == n).unwrap();
        assert!(read_text(by_name("bin.dat"), 1024).is_none());
        assert!(read_text(by_name("big.js"), 32).is_none());
        assert_eq!(read_text(by_name("ok.js"), 1024).as_deref(), Some("const a = 1;"));
    }

    #[test]
    fn extension_handling() {
        assert_eq!(extension_of("lib/a.JS").as_deref(), Some("js"));
        assert_eq!(extension_of("Makefile"), None);
        assert_eq!(extension_of(".env"), None);
        assert_eq!(extension_of("a.test.ts").as_deref(), Some("ts"));
    }
}
