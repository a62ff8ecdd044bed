//! Path confinement: virtual path strings to host paths and back.
//!
//! Resolution is purely lexical. `..` and `.` are collapsed without touching
//! the host filesystem, then the result is checked component-wise against the
//! sandbox root. Anything that is not the root or a descendant of it is
//! replaced by the root itself.

use std::path::{Component, Path, PathBuf};

/// Collapse `.`, `..` and redundant separators without consulting the host.
///
/// `..` at the filesystem root stays at the root. For relative inputs a
/// leading `..` that cannot be collapsed is kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if out.file_name().is_some() {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// True when `path` is `root` or lies underneath it, compared component by
/// component. `/srv/disk2` is not within `/srv/disk`.
pub fn is_within(root: &Path, path: &Path) -> bool {
    path.starts_with(root)
}

/// Map a virtual path to a host path confined to `root`.
///
/// Paths starting with `/` are taken relative to `root`; everything else is
/// taken relative to `cwd`. Never fails: escapes clamp to `root`.
pub fn resolve_in(root: &Path, cwd: &Path, path: &str) -> PathBuf {
    let joined = match path.strip_prefix('/') {
        Some(rest) => root.join(rest.trim_start_matches('/')),
        None => cwd.join(path),
    };

    let normalized = normalize(&joined);
    if is_within(root, &normalized) {
        normalized
    } else {
        root.to_path_buf()
    }
}

/// Map a host path back to a display path in sandbox namespace.
///
/// Strips the root prefix and normalizes separators to `/`. The root itself
/// (and any empty result) becomes `/`. Host paths outside the root are shown
/// unchanged apart from separator normalization.
pub fn clean(root: &Path, host: &Path) -> String {
    let shown = match host.strip_prefix(root) {
        Ok(rel) => format!("/{}", rel.to_string_lossy()),
        Err(_) => host.to_string_lossy().into_owned(),
    };
    let shown = shown.replace('\\', "/");
    let trimmed = shown.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
