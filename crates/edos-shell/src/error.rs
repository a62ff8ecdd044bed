use std::io;

use edos_disk::ArchiveError;
use thiserror::Error;

/// Errors that end the dispatch loop or the session.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The user pressed the interrupt key while a line was being read.
    #[error("interrupted")]
    Interrupted,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("disk error: {0}")]
    Archive(#[from] ArchiveError),
}

/// Render an error and its `source()` chain, one cause per line.
pub fn report(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\n  caused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
