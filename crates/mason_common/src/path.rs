//! Canonical and relative path computation.
//!
//! Every cache key is a canonical absolute path, and generated build files
//! refer to sources through paths relative to the generated file's directory,
//! so both helpers must agree on what "canonical" means even for files that
//! do not exist yet.

use std::path::{Component, Path, PathBuf};

/// Returns the canonical absolute form of `path`.
///
/// Existing paths are resolved through [`std::fs::canonicalize`]. For paths
/// that do not exist yet (an output file before its first write), the longest
/// existing ancestor is canonicalized and the remaining components are
/// appended, so the key for a file is the same before and after it is
/// created. Never fails: if nothing can be resolved the lexically normalized
/// absolute path is returned.
pub fn canonical_path(path: &Path) -> PathBuf {
    let absolute = normalize(&std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()));
    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }

    let mut existing = absolute.as_path();
    let mut tail = Vec::new();
    while let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) {
        tail.push(name.to_os_string());
        existing = parent;
        if let Ok(mut canonical) = std::fs::canonicalize(existing) {
            for part in tail.iter().rev() {
                canonical.push(part);
            }
            return canonical;
        }
    }
    absolute
}

/// Computes the relative path from directory `from` to `to`, with `/`
/// separators.
///
/// Both paths are canonicalized first. The common leading components are
/// trimmed, one `..` is emitted for every remaining component of `from`, and
/// the remainder of `to` is appended. If the two paths live on different
/// roots (different drives on Windows) the canonical `to` path is returned
/// unchanged. Identical paths yield an empty string.
pub fn relative_path(from: &Path, to: &Path) -> String {
    let from = canonical_path(from);
    let to = canonical_path(to);

    let from_parts = parts(&from);
    let to_parts = parts(&to);

    if from_parts.first() != to_parts.first() || from_parts.is_empty() {
        return to.to_string_lossy().replace('\\', "/");
    }

    let min_len = from_parts.len().min(to_parts.len());
    let mut same = 1;
    while same < min_len && from_parts[same] == to_parts[same] {
        same += 1;
    }

    let mut out: Vec<&str> = Vec::new();
    out.extend(std::iter::repeat("..").take(from_parts.len() - same));
    out.extend(to_parts[same..].iter().map(String::as_str));
    out.join("/")
}

fn parts(path: &Path) -> Vec<String> {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}

/// Removes `.` components and folds `..` into the preceding component.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
