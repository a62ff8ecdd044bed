//! Archive-backed persistence for the working copy.
//!
//! State machine:
//!
//! ```text
//! Uninitialized ──materialize──► Materialized ──shutdown──► Serialized
//!                                      │
//!                                      └──────discard──────► Discarded
//! ```
//!
//! The archive is the only durable copy. The working copy is a fixed-name
//! directory in the host temp dir, so two concurrent sessions on one host
//! share (and clobber) it. Changes made after the last successful shutdown
//! are lost if the process is killed before shutdown runs.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::error::ArchiveError;
use crate::resolver;

/// Directory name of the working copy under the host temp dir.
pub const WORKING_COPY_NAME: &str = "edos_disk";

/// Name of the uncompressed legacy disk folder, a sibling of the archive.
pub const LEGACY_FOLDER_NAME: &str = "disk";

/// Where the archive, working copy, and legacy folder live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub archive: PathBuf,
    pub working_copy: PathBuf,
    pub legacy_folder: PathBuf,
    /// Use the legacy folder in place and bypass the archive entirely.
    pub use_disk_folder: bool,
}

impl StoreOptions {
    /// Default layout for an archive: working copy at `<tmp>/edos_disk`,
    /// legacy folder `disk` next to the archive.
    pub fn new(archive: impl Into<PathBuf>) -> Self {
        let archive = archive.into();
        let legacy_folder = match archive.parent() {
            Some(parent) => parent.join(LEGACY_FOLDER_NAME),
            None => PathBuf::from(LEGACY_FOLDER_NAME),
        };
        Self {
            archive,
            working_copy: std::env::temp_dir().join(WORKING_COPY_NAME),
            legacy_folder,
            use_disk_folder: false,
        }
    }

    pub fn with_working_copy(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_copy = path.into();
        self
    }

    pub fn with_legacy_folder(mut self, path: impl Into<PathBuf>) -> Self {
        self.legacy_folder = path.into();
        self
    }

    pub fn with_disk_folder(mut self, enabled: bool) -> Self {
        self.use_disk_folder = enabled;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskState {
    Uninitialized,
    Materialized,
    Serialized,
    Discarded,
}

/// Owns the lifecycle of one working copy.
///
/// Dropping a store that is still [`DiskState::Materialized`] runs
/// [`ArchiveStore::shutdown`], so the archive is rewritten on normal return,
/// on error return, and while unwinding from a panic.
#[derive(Debug)]
pub struct ArchiveStore {
    options: StoreOptions,
    root: PathBuf,
    folder_mode: bool,
    state: DiskState,
}

impl ArchiveStore {
    pub fn new(options: StoreOptions) -> Self {
        Self {
            root: options.working_copy.clone(),
            options,
            folder_mode: false,
            state: DiskState::Uninitialized,
        }
    }

    /// Create a store and materialize it in one step.
    pub fn open(options: StoreOptions) -> Result<Self, ArchiveError> {
        let mut store = Self::new(options);
        store.materialize()?;
        Ok(store)
    }

    /// Host directory that is the top of the virtual namespace.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archive_path(&self) -> &Path {
        &self.options.archive
    }

    pub fn state(&self) -> DiskState {
        self.state
    }

    pub fn is_folder_mode(&self) -> bool {
        self.folder_mode
    }

    /// Bring the working copy into existence.
    ///
    /// A legacy folder is used in place when folder mode is requested and is
    /// otherwise migrated into the archive and removed. The archive, if any,
    /// is then extracted into the working copy. Extraction validates every
    /// member before writing anything.
    pub fn materialize(&mut self) -> Result<(), ArchiveError> {
        if self.state != DiskState::Uninitialized {
            return Ok(());
        }

        let legacy = self.options.legacy_folder.clone();
        if self.options.use_disk_folder {
            fs::create_dir_all(&legacy).map_err(|e| ArchiveError::io(&legacy, e))?;
            info!(folder = %legacy.display(), "using legacy disk folder in place");
            self.root = legacy;
            self.folder_mode = true;
            self.state = DiskState::Materialized;
            return Ok(());
        }

        if legacy.is_dir() {
            info!(
                folder = %legacy.display(),
                archive = %self.options.archive.display(),
                "migrating legacy disk folder into archive"
            );
            compress_dir(&legacy, &self.options.archive)?;
            fs::remove_dir_all(&legacy).map_err(|e| ArchiveError::io(&legacy, e))?;
        }

        let root = self.options.working_copy.clone();
        if !root.is_dir() {
            fs::create_dir_all(&root).map_err(|e| ArchiveError::io(&root, e))?;
        }

        if self.options.archive.is_file() {
            debug!(
                archive = %self.options.archive.display(),
                root = %root.display(),
                "extracting archive"
            );
            extract_archive(&self.options.archive, &root)?;
        }

        self.root = root;
        self.state = DiskState::Materialized;
        Ok(())
    }

    /// Compress the working copy over the archive and delete the working copy.
    ///
    /// No-op in folder mode and in any state other than `Materialized`. The
    /// archive is replaced atomically; the working copy is only removed once
    /// the new archive is in place.
    pub fn shutdown(&mut self) -> Result<(), ArchiveError> {
        if self.state != DiskState::Materialized {
            return Ok(());
        }
        if self.folder_mode {
            self.state = DiskState::Serialized;
            return Ok(());
        }

        debug!(
            root = %self.root.display(),
            archive = %self.options.archive.display(),
            "archiving working copy"
        );
        compress_dir(&self.root, &self.options.archive)?;
        fs::remove_dir_all(&self.root).map_err(|e| ArchiveError::io(&self.root, e))?;
        self.state = DiskState::Serialized;
        Ok(())
    }

    /// Delete the working copy without touching the archive.
    pub fn discard(&mut self) -> Result<(), ArchiveError> {
        if self.state != DiskState::Materialized {
            return Ok(());
        }
        if !self.folder_mode && self.root.exists() {
            fs::remove_dir_all(&self.root).map_err(|e| ArchiveError::io(&self.root, e))?;
        }
        self.state = DiskState::Discarded;
        Ok(())
    }
}

impl Drop for ArchiveStore {
    fn drop(&mut self) {
        if self.state == DiskState::Materialized {
            if let Err(e) = self.shutdown() {
                error!("failed to archive disk on exit: {e}");
            }
        }
    }
}

/// Write every entry under `src` into a gzip tar at `archive`, with member
/// names relative to `src`. Symlinks are stored as links; links pointing
/// outside `src` are left out, since extraction would refuse them.
pub fn compress_dir(src: &Path, archive: &Path) -> Result<(), ArchiveError> {
    let parent = match archive.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| ArchiveError::io(&parent, e))?;

    let staging = NamedTempFile::new_in(&parent).map_err(|e| ArchiveError::io(&parent, e))?;
    let mut builder = tar::Builder::new(GzEncoder::new(staging, Compression::default()));
    builder.follow_symlinks(false);

    let walker = WalkDir::new(src)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|source| ArchiveError::Walk {
            path: src.to_path_buf(),
            source,
        })?;
        let Ok(name) = entry.path().strip_prefix(src) else {
            continue;
        };
        if entry.path_is_symlink() {
            if let Ok(target) = fs::read_link(entry.path()) {
                if symlink_escapes(src, name, &target) {
                    warn!(link = %name.display(), target = %target.display(), "skipping link that leaves the disk");
                    continue;
                }
            }
        }
        let appended = if entry.file_type().is_dir() {
            builder.append_dir(name, entry.path())
        } else {
            builder.append_path_with_name(entry.path(), name)
        };
        appended.map_err(|e| ArchiveError::io(entry.path(), e))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| ArchiveError::io(archive, e))?;
    let staging = encoder.finish().map_err(|e| ArchiveError::io(archive, e))?;
    staging
        .persist(archive)
        .map_err(|e| ArchiveError::io(archive, e.error))?;
    Ok(())
}

/// Extract a gzip tar into `dest`.
///
/// All member names and link targets are checked first; a single member
/// that would land or point outside `dest` aborts before anything is
/// written. Symlinks are checked again on disk after unpacking.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
    fs::create_dir_all(dest).map_err(|e| ArchiveError::io(dest, e))?;
    let dest = dest
        .canonicalize()
        .map_err(|e| ArchiveError::io(dest, e))?;

    let mut reader = open_archive(archive)?;
    let entries = reader.entries().map_err(|e| ArchiveError::io(archive, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ArchiveError::io(archive, e))?;
        let member = entry.path().map_err(|e| ArchiveError::io(archive, e))?;
        check_member(&dest, &member)?;

        let kind = entry.header().entry_type();
        if kind.is_hard_link() || kind.is_symlink() {
            if let Some(target) = entry
                .link_name()
                .map_err(|e| ArchiveError::io(archive, e))?
            {
                if kind.is_hard_link() {
                    check_member(&dest, &target)?;
                } else if symlink_escapes(&dest, &member, &target) {
                    return Err(traversal(&member));
                }
            }
        }
    }

    let mut reader = open_archive(archive)?;
    reader.set_preserve_permissions(true);
    reader.set_overwrite(true);
    reader
        .unpack(&dest)
        .map_err(|e| ArchiveError::io(&dest, e))?;

    check_unpacked_links(&dest)
}

/// Links that pass the lexical check can still escape through each other
/// (`b -> .` then `a -> b/..`). Resolve every unpacked link on disk and
/// remove the first one found outside `dest`.
fn check_unpacked_links(dest: &Path) -> Result<(), ArchiveError> {
    for entry in WalkDir::new(dest).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|source| ArchiveError::Walk {
            path: dest.to_path_buf(),
            source,
        })?;
        if !entry.path_is_symlink() {
            continue;
        }
        // Dangling links were already checked lexically.
        let Ok(resolved) = entry.path().canonicalize() else {
            continue;
        };
        if !resolver::is_within(dest, &resolved) {
            let link = entry.path().strip_prefix(dest).unwrap_or(entry.path());
            error!(link = %link.display(), "unpacked link resolves outside the disk");
            fs::remove_file(entry.path()).map_err(|e| ArchiveError::io(entry.path(), e))?;
            return Err(traversal(link));
        }
    }
    Ok(())
}

/// Whether a link at `member` pointing to `target` leaves `dest`.
/// Absolute targets always do.
fn symlink_escapes(dest: &Path, member: &Path, target: &Path) -> bool {
    if target.has_root() {
        return true;
    }
    let parent = member.parent().unwrap_or(Path::new(""));
    let resolved = resolver::normalize(&dest.join(parent).join(target));
    !resolver::is_within(dest, &resolved)
}

fn traversal(member: &Path) -> ArchiveError {
    ArchiveError::PathTraversal {
        member: member.to_string_lossy().into_owned(),
    }
}

fn open_archive(path: &Path) -> Result<tar::Archive<GzDecoder<File>>, ArchiveError> {
    let file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
    Ok(tar::Archive::new(GzDecoder::new(file)))
}

fn check_member(dest: &Path, member: &Path) -> Result<(), ArchiveError> {
    let target = resolver::normalize(&dest.join(member));
    if member.has_root() || !resolver::is_within(dest, &target) {
        return Err(traversal(member));
    }
    Ok(())
}
