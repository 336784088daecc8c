//! Lexical path utilities for report output.
//!
//! Report rows show each path relative to the scanned root. The cache may
//! also hold entries recorded from other roots, so the computation must work
//! for paths outside the root too. It is purely lexical: nothing touches the
//! filesystem and symlinks are not resolved.
//!
//! # Example
//!
//! ```
//! use favscan::scanner::path_utils::relative_to;
//! use std::path::{Path, PathBuf};
//!
//! let rel = relative_to(Path::new("/data/media/a.iso"), Path::new("/data"));
//! assert_eq!(rel, Some(PathBuf::from("media/a.iso")));
//!
//! let rel = relative_to(Path::new("/srv/b.iso"), Path::new("/data/media"));
//! assert_eq!(rel, Some(PathBuf::from("../../srv/b.iso")));
//! ```

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
///
/// Leading `..` components of a relative path are kept, and `..` directly
/// under the root stays at the root.
#[must_use]
pub fn clean(path: &Path) -> Vec<Component<'_>> {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    out
}

/// Compute `path` relative to `base`.
///
/// Returns `None` when one path is absolute and the other is not, since no
/// lexical answer exists. Returns `.` when both are the same.
#[must_use]
pub fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    if path.is_absolute() != base.is_absolute() {
        return None;
    }

    let path_parts = clean(path);
    let base_parts = clean(base);

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    // A relative base that climbs above the common prefix cannot be undone
    if base_parts[common..]
        .iter()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return None;
    }

    let mut rel = PathBuf::new();
    for _ in common..base_parts.len() {
        rel.push("..");
    }
    for part in &path_parts[common..] {
        rel.push(part.as_os_str());
    }

    if rel.as_os_str().is_empty() {
        rel.push(".");
    }

    Some(rel)
}

/// Render `path` for a report row as `./<relative>` with `/` separators.
///
/// Falls back to the path as given when no relative form exists.
#[must_use]
pub fn report_display(path: &Path, root: &Path) -> String {
    let rel = relative_to(path, root).unwrap_or_else(|| path.to_path_buf());
    let rendered = rel.to_string_lossy();
    let rendered = if cfg!(windows) {
        rendered.replace('\\', "/")
    } else {
        rendered.into_owned()
    };
    format!("./{rendered}")
}
