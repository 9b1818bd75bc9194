// Error types for synchronization
// Every failure carries the path it concerns and the operation that was attempted

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Operation that was being performed when a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOp {
    CreateRoot,
    Enumerate,
    Hash,
    CreateDirectory,
    Copy,
    DeleteFile,
    DeleteDirectory,
}

impl SyncOp {
    /// Verb used in log messages ("Failed to <verb> <path>")
    pub fn verb(&self) -> &'static str {
        match self {
            SyncOp::CreateRoot => "create replica root",
            SyncOp::Enumerate => "enumerate",
            SyncOp::Hash => "hash",
            SyncOp::CreateDirectory => "create directory",
            SyncOp::Copy => "copy",
            SyncOp::DeleteFile => "delete",
            SyncOp::DeleteDirectory => "delete directory",
        }
    }
}

impl fmt::Display for SyncOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Error raised by a single filesystem operation during a cycle
#[derive(Debug)]
pub enum SyncError {
    NotFound { path: PathBuf, op: SyncOp },
    PermissionDenied { path: PathBuf, op: SyncOp },
    AlreadyExists { path: PathBuf, op: SyncOp },
    Io { path: PathBuf, op: SyncOp, source: io::Error },
    Copy { from: PathBuf, to: PathBuf, source: io::Error },
    Walk { path: PathBuf, reason: String },
    InvalidConfig { message: String },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SyncError::NotFound { path, op } => {
                write!(f, "cannot {} {}: no such file or directory", op, path.display())
            }
            SyncError::PermissionDenied { path, op } => {
                write!(f, "cannot {} {}: permission denied", op, path.display())
            }
            SyncError::AlreadyExists { path, op } => {
                write!(f, "cannot {} {}: a different entry already exists there", op, path.display())
            }
            SyncError::Io { path, op, source } => {
                write!(f, "cannot {} {}: {}", op, path.display(), source)
            }
            SyncError::Copy { from, to, source } => {
                write!(f, "cannot copy {} -> {}: {}", from.display(), to.display(), source)
            }
            SyncError::Walk { path, reason } => {
                write!(f, "cannot enumerate {}: {}", path.display(), reason)
            }
            SyncError::InvalidConfig { message } => {
                write!(f, "invalid configuration: {}", message)
            }
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Io { source, .. } | SyncError::Copy { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl SyncError {
    /// Map an io::Error onto the most specific variant for the given path and operation
    pub fn from_io_error(err: io::Error, op: SyncOp, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => SyncError::NotFound { path, op },
            io::ErrorKind::PermissionDenied => SyncError::PermissionDenied { path, op },
            io::ErrorKind::AlreadyExists => SyncError::AlreadyExists { path, op },
            _ => SyncError::Io { path, op, source: err },
        }
    }

    /// Path the failure concerns, if any
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            SyncError::NotFound { path, .. }
            | SyncError::PermissionDenied { path, .. }
            | SyncError::AlreadyExists { path, .. }
            | SyncError::Io { path, .. }
            | SyncError::Walk { path, .. } => Some(path),
            SyncError::Copy { to, .. } => Some(to),
            SyncError::InvalidConfig { .. } => None,
        }
    }
}
