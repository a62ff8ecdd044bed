//! Sandbox-relative filesystem facade.
//!
//! Every operation resolves its argument through [`VirtualFs::resolve`] and
//! then delegates to the host filesystem. No other sandbox logic lives here.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::resolver;

/// A confined view of one working copy, with its own current directory.
#[derive(Debug, Clone)]
pub struct VirtualFs {
    root: PathBuf,
    cwd: PathBuf,
}

impl VirtualFs {
    /// Create a view rooted at `root`, with the cwd at the root.
    ///
    /// The root is canonicalized when it exists so that host paths reported by
    /// launched processes compare equal to resolved paths.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .unwrap_or_else(|_| resolver::normalize(root));
        Self {
            cwd: root.clone(),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Host path of the current directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Map a virtual path to a host path inside the root. Never fails.
    pub fn resolve(&self, path: &str) -> PathBuf {
        resolver::resolve_in(&self.root, &self.cwd, path)
    }

    pub fn clean(&self, host: &Path) -> String {
        resolver::clean(&self.root, host)
    }

    /// Current directory in sandbox namespace (`/` at the root).
    pub fn getcwd(&self) -> String {
        self.clean(&self.cwd)
    }

    /// Change the current directory. The target must be an existing directory.
    pub fn chdir(&mut self, path: &str) -> io::Result<()> {
        let target = self.resolve(path);
        if !target.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: not a directory", self.clean(&target)),
            ));
        }
        self.cwd = target;
        Ok(())
    }

    pub fn open(&self, path: &str, options: &OpenOptions) -> io::Result<File> {
        options.open(self.resolve(path))
    }

    pub fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path))
    }

    pub fn read_to_string(&self, path: &str) -> io::Result<String> {
        fs::read_to_string(self.resolve(path))
    }

    pub fn write(&self, path: &str, contents: impl AsRef<[u8]>) -> io::Result<()> {
        fs::write(self.resolve(path), contents)
    }

    /// Entry names of a directory in host listing order. `None` lists the cwd.
    pub fn list_dir(&self, path: Option<&str>) -> io::Result<Vec<String>> {
        let dir = match path {
            Some(p) => self.resolve(p),
            None => self.cwd.clone(),
        };
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    /// Remove a file (not a directory).
    pub fn remove(&self, path: &str) -> io::Result<()> {
        fs::remove_file(self.resolve(path))
    }

    pub fn create_dir(&self, path: &str) -> io::Result<()> {
        fs::create_dir_all(self.resolve(path))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.resolve(path).is_dir()
    }

    pub fn is_symlink(&self, path: &str) -> bool {
        self.resolve(path).is_symlink()
    }
}
