use serde::{Deserialize, Serialize};

/// Content-addressed identity of a package directory.
///
/// Two trees with the same relative paths and byte contents always produce
/// the same `hash`, whatever order the OS enumerates them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageFingerprint {
    /// Lowercase hex SHA-256
    pub hash: String,
    pub file_count: usize,
    /// Sum of file sizes in bytes
    pub total_size: u64,
}

impl PackageFingerprint {
    /// First 12 hex chars, for display
    #[must_use]
    pub fn short(&self) -> &str {
        short_hash(&self.hash)
    }
}

/// Display prefix of a hash: at most 12 characters.
///
/// Hashes read back from state files are not guaranteed to be hex, so the cut
/// always lands on a character boundary.
#[must_use]
pub fn short_hash(hash: &str) -> &str {
    hash.char_indices().nth(12).map_or(hash, |(end, _)| &hash[..end])
}
