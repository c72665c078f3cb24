//! Streaming SHA-256 hashing via `ring::digest`.

use ring::digest::{Context, SHA256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use skillgate_core::{AuditError, PackageFingerprint, Result};

use crate::discovery::package_files;

/// Buffer size for streaming file reads (64 KiB).
const BUF_SIZE: usize = 64 * 1024;

/// Compute the content-addressed fingerprint of a package directory.
///
/// Files are fed to a single digest in sorted relative-path order, each as
/// `relPath:byteLength\n` followed by the raw bytes. Files that cannot be
/// read are left out of the walk rather than failing the whole fingerprint.
#[must_use]
pub fn fingerprint(root: &Path) -> PackageFingerprint {
    let mut context = Context::new(&SHA256);
    let mut file_count = 0;
    let mut total_size = 0u64;

    for file in package_files(root) {
        // Read fully first so a failure mid-file leaves the digest untouched.
        let bytes = match std::fs::read(&file.path) {
            Ok(b) => b,
            Err(e) => {
                debug!(path = %file.rel_path, error = %e, "leaving unreadable file out of fingerprint");
                continue;
            }
        };
        context.update(format!("{}:{}\n", file.rel_path, bytes.len()).as_bytes());
        context.update(&bytes);
        file_count += 1;
        total_size += bytes.len() as u64;
    }

    PackageFingerprint {
        hash: hex::encode(context.finish().as_ref()),
        file_count,
        total_size,
    }
}

/// Per-file content hashes keyed by relative path.
///
/// Unreadable files are omitted.
#[must_use]
pub fn file_hashes(root: &Path) -> BTreeMap<String, String> {
    package_files(root)
        .into_iter()
        .filter_map(|file| match sha256_file(&file.path) {
            Ok(hash) => Some((file.rel_path, hash)),
            Err(e) => {
                debug!(path = %file.rel_path, error = %e, "skipping unhashable file");
                None
            }
        })
        .collect()
}

/// Compute SHA-256 of a file, streaming to avoid loading it all into memory.
///
/// Returns lowercase hex-encoded digest.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| AuditError::io(path, e))?;

    let mut context = Context::new(&SHA256);
    let mut buf = vec![0u8; BUF_SIZE];

    loop {
        let n = file.read(&mut buf).map_err(|e| AuditError::io(path, e))?;
        if n == 0 {
            break;
        }
        context.update(&buf[..n]);
    }

    Ok(hex::encode(context.finish().as_ref()))
}

/// Compute SHA-256 of raw bytes.
#[must_use]
pub fn sha256_bytes(data: &[u8]) -> String {
    let digest = ring::digest::digest(&SHA256, data);
    hex::encode(digest.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn test_sha256_file() {
        let dir = tree(&[("hello.txt", "hello world")]);
        let hash = sha256_file(&dir.path().join("hello.txt")).unwrap();
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_sha256_bytes() {
        let hash = sha256_bytes(b"hello world");
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn fingerprint_matches_documented_framing() {
        let dir = tree(&[("b.js", "two"), ("a.js", "one")]);
        let fp = fingerprint(dir.path());
        assert_eq!(fp.hash, sha256_bytes(b"a.js:3\noneb.js:3\ntwo"));
        assert_eq!(fp.file_count, 2);
        assert_eq!(fp.total_size, 6);
    }

    #[test]
    fn fingerprint_is_independent_of_creation_order() {
        let first = tree(&[("z/last.js", "z"), ("SKILL.md", "# s"), ("a.js", "a")]);
        let second = tree(&[("a.js", "a"), ("SKILL.md", "# s"), ("z/last.js", "z")]);
        assert_eq!(fingerprint(first.path()), fingerprint(second.path()));
    }

    #[test]
    fn fingerprint_changes_with_content_or_path() {
        let base = fingerprint(tree(&[("a.js", "a")]).path());
        let edited = fingerprint(tree(&[("a.js", "b")]).path());
        let renamed = fingerprint(tree(&[("b.js", "a")]).path());
        assert_ne!(base.hash, edited.hash);
        assert_ne!(base.hash, renamed.hash);
    }

    #[test]
    fn fingerprint_ignores_ephemeral_dirs() {
        let clean = fingerprint(tree(&[("a.js", "a")]).path());
        let noisy = fingerprint(tree(&[("a.js", "a"), ("node_modules/x/i.js", "x"), (".git/HEAD", "h")]).path());
        assert_eq!(clean, noisy);
    }

    #[test]
    fn empty_directory_has_stable_fingerprint() {
        let fp = fingerprint(TempDir::new().unwrap().path());
        assert_eq!(fp.file_count, 0);
        assert_eq!(
            fp.hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
