//! Path completion for the last word on the input line.

use edos_disk::VirtualFs;

/// Proposes a replacement for a partial word, or nothing.
pub trait Completer {
    fn complete(&self, token: &str) -> Option<String>;
}

impl<F> Completer for F
where
    F: Fn(&str) -> Option<String>,
{
    fn complete(&self, token: &str) -> Option<String> {
        self(token)
    }
}

/// Completes absolute sandbox paths against the directory listing.
pub struct PathCompleter<'a> {
    vfs: &'a VirtualFs,
}

impl<'a> PathCompleter<'a> {
    pub fn new(vfs: &'a VirtualFs) -> Self {
        Self { vfs }
    }
}

impl Completer for PathCompleter<'_> {
    fn complete(&self, token: &str) -> Option<String> {
        complete_with(token, |parent| {
            let host = self.vfs.resolve(parent);
            if !host.is_dir() {
                return None;
            }
            let entries = self.vfs.list_dir(Some(parent)).ok()?;
            Some((self.vfs.clean(&host), entries))
        })
    }
}

/// Completion against an arbitrary lister.
///
/// `list_dir(parent)` returns the parent's display path and its entries in
/// listing order, or `None` when the parent is not a directory. The first
/// entry whose name starts with the last path segment (ignoring case) wins.
/// This is the testable core: tests provide a lister with a fixed order,
/// production lists the host directory.
pub fn complete_with<F>(token: &str, list_dir: F) -> Option<String>
where
    F: Fn(&str) -> Option<(String, Vec<String>)>,
{
    let value = strip_quotes(token);
    if !value.starts_with('/') {
        return None;
    }

    let (parent, partial) = value.rsplit_once('/')?;
    let parent = if parent.is_empty() { "/" } else { parent };
    let (dir, entries) = list_dir(parent)?;

    let partial = partial.to_lowercase();
    let name = entries
        .into_iter()
        .find(|name| name.to_lowercase().starts_with(&partial))?;

    let path = if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    };
    if path.contains(' ') {
        Some(format!("\"{path}\""))
    } else {
        Some(path)
    }
}

/// Remove one layer of double quotes (either side may be missing).
fn strip_quotes(token: &str) -> &str {
    let token = token.strip_prefix('"').unwrap_or(token);
    token.strip_suffix('"').unwrap_or(token)
}
