//! edos-shell: interactive command shell for the eDOS virtual disk.
//!
//! This crate contains the line editor, path completion, macro registry and
//! the command dispatch loop. Exposed as a library for integration testing.

pub mod completer;
pub mod config;
pub mod editor;
pub mod error;
pub mod keys;
pub mod launcher;
pub mod logging;
pub mod macros;
pub mod renderer;
pub mod search_path;
pub mod session;
pub mod shell;
pub mod signals;
pub mod style;
pub mod testing;
pub mod tokenize;

pub use error::ShellError;
pub use session::ShellSession;
pub use shell::{Dispatch, Shell};
