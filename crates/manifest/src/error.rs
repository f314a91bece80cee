//! Manifest error types.

use std::path::PathBuf;

/// Errors produced while scanning a deploy root.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read file {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is outside the deploy root {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },
}
