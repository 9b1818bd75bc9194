use std::collections::{BTreeMap, BTreeSet};

use crate::fs::path_utils::ancestors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

/// A path relative to its tree root, using `/` as separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathEntry {
    pub path: String,
    pub kind: EntryKind,
}

impl PathEntry {
    pub fn file(path: impl Into<String>) -> Self {
        Self { path: path.into(), kind: EntryKind::File }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self { path: path.into(), kind: EntryKind::Directory }
    }
}

/// Point-in-time listing of a tree. Built fresh for every cycle.
///
/// Both sets are ordered, so a parent directory always comes before
/// anything beneath it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    pub directories: BTreeSet<String>,
    pub files: BTreeSet<String>,
    /// Entries that could not be read, with the reason. Their contents are
    /// unknown, not absent.
    pub unreadable: BTreeMap<String, String>,
}

impl TreeSnapshot {
    pub fn insert(&mut self, entry: PathEntry) {
        match entry.kind {
            EntryKind::File => self.files.insert(entry.path),
            EntryKind::Directory => self.directories.insert(entry.path),
        };
    }

    pub fn mark_unreadable(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        self.unreadable.insert(path.into(), reason.into());
    }

    /// Whether `path` is, or lies beneath, an entry that could not be read.
    pub fn is_hidden_by_unreadable(&self, path: &str) -> bool {
        if self.unreadable.is_empty() {
            return false;
        }
        self.unreadable.contains_key(path)
            || ancestors(path).any(|ancestor| self.unreadable.contains_key(ancestor))
    }

    pub fn contains_file(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    pub fn contains_directory(&self, path: &str) -> bool {
        self.directories.contains(path)
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = PathEntry> + '_ {
        self.directories
            .iter()
            .map(|d| PathEntry::directory(d.as_str()))
            .chain(self.files.iter().map(|f| PathEntry::file(f.as_str())))
    }
}
