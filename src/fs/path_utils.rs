// Relative path handling
// Paths are matched across trees by their slash-separated form relative to each root

use std::path::{Component, Path, PathBuf};

/// Express `path` relative to `root` with `/` separators.
/// Returns None when `path` is not beneath `root` or is the root itself.
pub fn relative_slash_path(path: &Path, root: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => continue,
            // A walk never yields these beneath its root
            _ => return None,
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Turn a relative slash path back into a filesystem path under `root`
pub fn join_relative(root: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(root.to_path_buf(), |acc, segment| acc.join(segment))
}

/// Proper ancestors of a relative slash path, nearest first.
/// `ancestors("a/b/c")` yields `"a/b"` then `"a"`.
pub fn ancestors(relative: &str) -> impl Iterator<Item = &str> {
    let mut current = relative;
    std::iter::from_fn(move || {
        let idx = current.rfind('/')?;
        current = &current[..idx];
        Some(current)
    })
}
