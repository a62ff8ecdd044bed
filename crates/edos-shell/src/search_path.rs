//! Executable lookup for command names that are not macros.

use std::path::PathBuf;

use edos_disk::VirtualFs;

/// Maps a command name to a host executable path.
pub trait SearchPath {
    fn resolve(&self, vfs: &VirtualFs, name: &str) -> Option<PathBuf>;
}

/// Probes a list of virtual directories in order.
///
/// Names containing `/` skip the search and resolve directly through the
/// sandbox, relative names against the current directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathHandler {
    dirs: Vec<String>,
}

impl Default for PathHandler {
    fn default() -> Self {
        Self::new(vec!["/bin".to_string()])
    }
}

impl PathHandler {
    pub fn new(dirs: Vec<String>) -> Self {
        Self { dirs }
    }

    pub fn dirs(&self) -> &[String] {
        &self.dirs
    }
}

impl SearchPath for PathHandler {
    fn resolve(&self, vfs: &VirtualFs, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        if name.contains('/') {
            let path = vfs.resolve(name);
            return path.is_file().then_some(path);
        }
        self.dirs
            .iter()
            .map(|dir| vfs.resolve(&format!("{}/{name}", dir.trim_end_matches('/'))))
            .find(|path| path.is_file())
    }
}
