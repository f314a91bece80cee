//! Deploy-root scanning.
//!
//! Recursively walks a directory and produces the manifest sent to the
//! remote (`/path -> sha1`) together with the two lookup tables used to map
//! the remote's `required` entries back to files on disk.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::ManifestError;
use crate::hasher::hash_file;

/// Directory names skipped by default, including their subtrees.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[".git", "node_modules", ".netlify"];

/// File names skipped by default.
pub const DEFAULT_IGNORE_FILES: &[&str] = &[".DS_Store"];

/// Normalized path -> hex digest. Ordered so the request body is stable.
pub type Manifest = BTreeMap<String, String>;

/// Normalized path -> absolute location on disk.
pub type PathIndex = HashMap<String, PathBuf>;

/// Hex digest -> one normalized path with that content (last seen wins).
pub type HashIndex = HashMap<String, String>;

/// Result of scanning a deploy root.
///
/// Every key of `manifest` is also a key of `paths`.
#[derive(Debug, Clone, Default)]
pub struct ScannedTree {
    pub manifest: Manifest,
    pub paths: PathIndex,
    pub hashes: HashIndex,
    total_bytes: u64,
}

impl ScannedTree {
    /// Number of files in the manifest.
    pub fn len(&self) -> usize {
        self.manifest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.is_empty()
    }

    /// Sum of the sizes of all scanned files.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Looks up the file behind a normalized manifest path.
    pub fn file_for_path(&self, normalized: &str) -> Option<&Path> {
        self.paths.get(normalized).map(PathBuf::as_path)
    }

    /// Looks up the manifest path recorded for a digest.
    ///
    /// Lookups are case-insensitive on the digest.
    pub fn path_for_digest(&self, digest: &str) -> Option<&str> {
        self.hashes
            .get(digest)
            .or_else(|| self.hashes.get(&digest.to_ascii_lowercase()))
            .map(String::as_str)
    }

    fn insert(&mut self, normalized: String, abs_path: PathBuf, digest: String, size: u64) {
        self.hashes.insert(digest.clone(), normalized.clone());
        self.paths.insert(normalized.clone(), abs_path);
        self.manifest.insert(normalized, digest);
        self.total_bytes += size;
    }
}

/// Builds a [`ScannedTree`] from a directory, skipping ignored names.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    ignore_dirs: HashSet<String>,
    ignore_files: HashSet<String>,
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self {
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|s| s.to_string()).collect(),
            ignore_files: DEFAULT_IGNORE_FILES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ManifestBuilder {
    /// Creates a builder with the default ignore sets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder that ignores nothing.
    pub fn empty() -> Self {
        Self {
            ignore_dirs: HashSet::new(),
            ignore_files: HashSet::new(),
        }
    }

    /// Skips every directory with this name, at any depth.
    pub fn ignore_dir(mut self, name: impl Into<String>) -> Self {
        self.ignore_dirs.insert(name.into());
        self
    }

    /// Skips every file with this name, at any depth.
    pub fn ignore_file(mut self, name: impl Into<String>) -> Self {
        self.ignore_files.insert(name.into());
        self
    }

    /// Scans `root` and hashes every eligible file.
    ///
    /// Any directory or file read error aborts the scan. An empty result is
    /// not an error here; callers decide what an empty tree means.
    pub fn build(&self, root: &Path) -> Result<ScannedTree, ManifestError> {
        let mut tree = ScannedTree::default();
        self.walk_dir(root, root, &mut tree)?;

        debug!(
            root = %root.display(),
            files = tree.len(),
            total_bytes = tree.total_bytes,
            "manifest built"
        );
        Ok(tree)
    }

    fn walk_dir(
        &self,
        root: &Path,
        current: &Path,
        tree: &mut ScannedTree,
    ) -> Result<(), ManifestError> {
        let read_dir_err = |source| ManifestError::ReadDir {
            path: current.to_path_buf(),
            source,
        };
        let entries = std::fs::read_dir(current).map_err(read_dir_err)?;

        for entry in entries {
            let entry = entry.map_err(read_dir_err)?;
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let file_type = entry.file_type().map_err(read_dir_err)?;

            if file_type.is_dir() {
                if self.ignore_dirs.contains(name.as_ref()) {
                    trace!(path = %path.display(), "skipping ignored directory");
                    continue;
                }
                self.walk_dir(root, &path, tree)?;
                continue;
            }

            if self.ignore_files.contains(name.as_ref()) {
                trace!(path = %path.display(), "skipping ignored file");
                continue;
            }

            // Symlinks are followed only when they point at a regular file.
            let metadata = if file_type.is_symlink() {
                match std::fs::metadata(&path) {
                    Ok(m) => m,
                    Err(source) => return Err(ManifestError::ReadFile { path, source }),
                }
            } else {
                entry.metadata().map_err(|source| ManifestError::ReadFile {
                    path: path.clone(),
                    source,
                })?
            };
            if !metadata.is_file() {
                trace!(path = %path.display(), "skipping non-regular file");
                continue;
            }

            let rel_path = path
                .strip_prefix(root)
                .map_err(|_| ManifestError::OutsideRoot {
                    path: path.clone(),
                    root: root.to_path_buf(),
                })?;
            let normalized = normalize_path(&rel_path.to_string_lossy());
            let digest = hash_file(&path).map_err(|source| ManifestError::ReadFile {
                path: path.clone(),
                source,
            })?;

            tree.insert(normalized, path, digest, metadata.len());
        }

        Ok(())
    }
}

/// Converts a root-relative path to manifest form.
///
/// OS separators become `/` and the result has exactly one leading `/`.
pub fn normalize_path(relative: &str) -> String {
    let forward = if std::path::MAIN_SEPARATOR == '/' {
        relative.to_string()
    } else {
        relative.replace(std::path::MAIN_SEPARATOR, "/")
    };
    format!("/{}", forward.trim_start_matches('/'))
}
