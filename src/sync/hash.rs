//! Content hashing for change detection.
//!
//! Files are compared by the SHA-256 of their full content. A file that
//! cannot be read produces the unavailable sentinel, which never matches
//! anything, so the reconciler treats it as changed and retries the copy.

use sha2::{Digest as _, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::sync::error::{SyncError, SyncOp};

const BUFFER_SIZE: usize = 64 * 1024;

/// SHA-256 digest of a file's content, or the unavailable sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digest(Option<[u8; 32]>);

impl Digest {
    /// Sentinel for a file that could not be read.
    pub const fn unavailable() -> Self {
        Self(None)
    }

    /// Whether this digest was computed from real content.
    pub fn is_available(&self) -> bool {
        self.0.is_some()
    }

    /// Content equality. The sentinel never matches, not even another sentinel.
    pub fn same_content(&self, other: &Digest) -> bool {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Lowercase hex, empty for the sentinel.
    pub fn to_hex(&self) -> String {
        match self.0 {
            Some(bytes) => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Hash an in-memory buffer.
pub fn digest_bytes(data: &[u8]) -> Digest {
    Digest(Some(Sha256::digest(data).into()))
}

/// Hash a file, propagating I/O errors.
pub fn try_digest_file(path: &Path) -> Result<Digest, SyncError> {
    let mut file =
        File::open(path).map_err(|e| SyncError::from_io_error(e, SyncOp::Hash, path))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| SyncError::from_io_error(e, SyncOp::Hash, path))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Digest(Some(hasher.finalize().into())))
}

/// Hash a file. Never fails: unreadable files yield [`Digest::unavailable`].
pub fn digest_file(path: &Path) -> Digest {
    match try_digest_file(path) {
        Ok(digest) => digest,
        Err(e) => {
            tracing::warn!("Error computing SHA256 for {}: {}", path.display(), e);
            Digest::unavailable()
        }
    }
}
