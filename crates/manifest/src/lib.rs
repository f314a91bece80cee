//! Content-addressed manifest of a local deploy tree.
//!
//! Walks a directory, hashes each file with SHA-1 and records three views
//! of the result: the manifest submitted to the remote, a path index back
//! to files on disk, and a digest index used when the remote asks for a
//! blob by hash instead of by path.

pub mod builder;
pub mod error;
pub mod hasher;

pub use builder::{
    DEFAULT_IGNORE_DIRS, DEFAULT_IGNORE_FILES, HashIndex, Manifest, ManifestBuilder, PathIndex,
    ScannedTree, normalize_path,
};
pub use error::ManifestError;
pub use hasher::{DIGEST_HEX_LEN, hash_bytes, hash_file, hash_reader, is_content_digest};
