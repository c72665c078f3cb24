//! Remote skill documents and their on-disk materialization.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

use crate::error::{HubError, Result};

/// How a file body is encoded in the hub response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileEncoding {
    #[default]
    Utf8,
    Base64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Path relative to the package root
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub encoding: FileEncoding,
}

/// A skill package as served by `GET /api/v1/skills/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSkill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub files: Vec<RemoteFile>,
}

/// A remote skill written to a temporary directory.
///
/// The directory is removed when this value is dropped.
#[derive(Debug)]
pub struct MaterializedSkill {
    _dir: TempDir,
    root: PathBuf,
}

impl MaterializedSkill {
    /// Package root inside the temporary directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RemoteSkill {
    /// Write the package into a fresh temporary directory.
    ///
    /// # Errors
    ///
    /// Fails on unsafe paths, undecodable bodies, or I/O errors.
    pub fn materialize(&self) -> Result<MaterializedSkill> {
        let dir = tempfile::Builder::new()
            .prefix("skillgate-hub-")
            .tempdir()
            .map_err(|e| HubError::io(std::env::temp_dir(), e))?;
        let root = dir.path().join(self.dir_name());
        self.write_to(&root)?;
        Ok(MaterializedSkill { _dir: dir, root })
    }

    /// Write every file under `root`, validating all paths first.
    ///
    /// # Errors
    ///
    /// Fails on unsafe paths, undecodable bodies, or I/O errors.
    pub fn write_to(&self, root: &Path) -> Result<()> {
        let planned = self
            .files
            .iter()
            .map(|f| Ok((safe_relative(&f.path)?, f)))
            .collect::<Result<Vec<_>>>()?;

        fs::create_dir_all(root).map_err(|e| HubError::io(root, e))?;
        for (rel, file) in planned {
            let bytes = match file.encoding {
                FileEncoding::Utf8 => file.content.clone().into_bytes(),
                FileEncoding::Base64 => STANDARD
                    .decode(file.content.trim())
                    .map_err(|_| HubError::Decode(file.path.clone()))?,
            };
            let dest = root.join(rel);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| HubError::io(parent, e))?;
            }
            fs::write(&dest, bytes).map_err(|e| HubError::io(&dest, e))?;
        }
        debug!(skill = %self.id, files = self.files.len(), root = %root.display(), "materialized remote skill");
        Ok(())
    }

    /// Directory name for the package root
    fn dir_name(&self) -> String {
        [self.name.as_str(), self.id.as_str()]
            .into_iter()
            .find(|n| is_plain_name(n))
            .unwrap_or("skill")
            .to_string()
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}

/// Validate a file path from the hub: relative, no `..`, no roots or
/// drive prefixes, and no backslash-separated escapes.
fn safe_relative(path: &str) -> Result<PathBuf> {
    let unsafe_path = || HubError::UnsafePath(path.to_string());
    if path.is_empty() || path.contains('\0') || path.contains('\\') || path.contains(':') {
        return Err(unsafe_path());
    }
    let mut clean = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path())
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(unsafe_path());
    }
    Ok(clean)
}
