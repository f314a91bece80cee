//! SHA-1 content digests.
//!
//! The remote blob store is keyed by the lowercase hex SHA-1 of each file,
//! so the digest must not depend on how the input is chunked.

use std::io::Read;
use std::path::Path;

use sha1::{Digest, Sha1};

/// Length of a hex-encoded SHA-1 digest.
pub const DIGEST_HEX_LEN: usize = 40;

const READ_BUF_SIZE: usize = 8192;

/// Streams `reader` to the end and returns its hex-encoded SHA-1.
///
/// Read errors are returned as-is.
pub fn hash_reader<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = Sha1::new();
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Computes the SHA-1 of a file without loading it into memory.
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let file = std::fs::File::open(path)?;
    hash_reader(file)
}

/// Computes the SHA-1 of an in-memory buffer.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Returns true if `s` has the shape of a content digest: 40 hex characters.
///
/// Upper-case hex is accepted.
pub fn is_content_digest(s: &str) -> bool {
    s.len() == DIGEST_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}
