use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from materializing or serializing the disk archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// An archive member would land outside the destination directory.
    #[error("attempted path traversal in archive member {member:?}")]
    PathTraversal { member: String },
    #[error("failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source,
        }
    }
}
