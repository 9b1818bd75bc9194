use jwalk::WalkDir;
use std::fs;
use std::path::Path;

use crate::fs::path_utils;
use crate::fs::types::{PathEntry, TreeSnapshot};
use crate::sync::error::{SyncError, SyncOp};

pub struct LocalFs;

impl LocalFs {
    /// Recursively enumerate every directory and regular file under `root`.
    ///
    /// Failing to read the root itself is an error. Entries below the root
    /// that cannot be read are kept in [`TreeSnapshot::unreadable`], so callers
    /// can tell "absent" apart from "not visible this time".
    pub fn snapshot(root: &Path) -> Result<TreeSnapshot, SyncError> {
        let metadata = fs::metadata(root)
            .map_err(|e| SyncError::from_io_error(e, SyncOp::Enumerate, root))?;
        if !metadata.is_dir() {
            return Err(SyncError::Walk {
                path: root.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let mut snapshot = TreeSnapshot::default();

        for entry_result in WalkDir::new(root)
            .parallelism(jwalk::Parallelism::RayonNewPool(0))
            .skip_hidden(false)
            .follow_links(false)
        {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let relative = e
                        .path()
                        .and_then(|path| path_utils::relative_slash_path(path, root));
                    match (e.depth(), relative) {
                        (depth, Some(relative)) if depth > 0 => {
                            tracing::warn!("Error walking {}: {}", root.display(), e);
                            snapshot.mark_unreadable(relative, e.to_string());
                            continue;
                        }
                        // Root, or an error that cannot be placed in the tree
                        _ => {
                            return Err(SyncError::Walk {
                                path: root.to_path_buf(),
                                reason: e.to_string(),
                            })
                        }
                    }
                }
            };

            if entry.depth == 0 {
                if let Some(e) = &entry.read_children_error {
                    return Err(SyncError::Walk {
                        path: root.to_path_buf(),
                        reason: e.to_string(),
                    });
                }
                continue;
            }

            let path = entry.path();
            let Some(relative) = path_utils::relative_slash_path(&path, root) else {
                continue;
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                if let Some(e) = &entry.read_children_error {
                    tracing::warn!("Cannot read directory {}: {}", path.display(), e);
                    snapshot.mark_unreadable(relative.clone(), e.to_string());
                }
                snapshot.insert(PathEntry::directory(relative));
            } else if file_type.is_file() {
                snapshot.insert(PathEntry::file(relative));
            } else {
                tracing::debug!("Skipping special entry {}", path.display());
            }
        }

        Ok(snapshot)
    }

    pub fn create_dir(path: &Path) -> Result<(), SyncError> {
        fs::create_dir_all(path)
            .map_err(|e| SyncError::from_io_error(e, SyncOp::CreateDirectory, path))
    }

    /// Copy `from` over `to`, creating missing parents. Returns the bytes written.
    pub fn copy_file(from: &Path, to: &Path) -> Result<u64, SyncError> {
        let copy_error = |source| SyncError::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        };
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(copy_error)?;
        }
        fs::copy(from, to).map_err(copy_error)
    }

    pub fn remove_file(path: &Path) -> Result<(), SyncError> {
        fs::remove_file(path).map_err(|e| SyncError::from_io_error(e, SyncOp::DeleteFile, path))
    }

    pub fn remove_dir_all(path: &Path) -> Result<(), SyncError> {
        fs::remove_dir_all(path)
            .map_err(|e| SyncError::from_io_error(e, SyncOp::DeleteDirectory, path))
    }
}
