//! Sandboxed virtual disk for eDOS.
//!
//! The disk is a rooted namespace (`/...`) backed by a host directory, the
//! *working copy*. Between sessions the working copy lives in a single
//! gzip-compressed tar archive; [`ArchiveStore`] materializes it at startup
//! and re-archives it at shutdown.
//!
//! # Architecture
//!
//! ```text
//! ArchiveStore::open ──► working copy ◄── VirtualFs (resolve / clean / io)
//!        │                                      ▲
//!        └── shutdown: compress + remove ───────┘ (session lifetime)
//! ```
//!
//! Every path handed to [`VirtualFs`] goes through [`VirtualFs::resolve`],
//! which never fails: paths that would leave the sandbox clamp to the root.
//!
//! # Usage
//!
//! ```no_run
//! use edos_disk::{ArchiveStore, StoreOptions, VirtualFs};
//!
//! let mut store = ArchiveStore::open(StoreOptions::new("/opt/edos/disk.edos"))
//!     .expect("failed to materialize disk");
//! let vfs = VirtualFs::new(store.root());
//! assert!(vfs.is_dir("/"));
//! store.shutdown().expect("failed to archive disk");
//! ```

pub mod archive;
pub mod error;
pub mod resolver;
pub mod vfs;

pub use archive::{ArchiveStore, DiskState, StoreOptions};
pub use error::ArchiveError;
pub use vfs::VirtualFs;

/// Environment variable carrying the sandbox root's host path into
/// launched processes.
pub const DISK_ENV_VAR: &str = "EDOS_DISK";
