//! Mapping `required` entries back to local files.
//!
//! The remote lists what it is missing either by manifest path or by content
//! digest. Lookup order: the entry as a manifest path, the entry with a
//! leading `/` added, then (for 40-hex entries) the digest index.
//!
//! When several local files share a digest only one of them is in the
//! digest index. Any of them satisfies the upload since the bytes are equal.

use std::path::PathBuf;

use sitepush_manifest::{ScannedTree, is_content_digest};

/// A `required` entry resolved to a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    /// Manifest path the file is uploaded under.
    pub path: String,
    /// Absolute location on disk.
    pub file: PathBuf,
}

/// Resolves one `required` entry, or `None` if no lookup matches.
pub fn resolve_required(entry: &str, tree: &ScannedTree) -> Option<ResolvedEntry> {
    if let Some(file) = tree.file_for_path(entry) {
        return Some(ResolvedEntry {
            path: entry.to_string(),
            file: file.to_path_buf(),
        });
    }

    if !entry.starts_with('/') {
        let slashed = format!("/{entry}");
        if let Some(file) = tree.file_for_path(&slashed) {
            return Some(ResolvedEntry {
                file: file.to_path_buf(),
                path: slashed,
            });
        }
    }

    if is_content_digest(entry) {
        let mapped = tree.path_for_digest(entry)?;
        let file = tree.file_for_path(mapped)?;
        return Some(ResolvedEntry {
            path: mapped.to_string(),
            file: file.to_path_buf(),
        });
    }

    None
}
