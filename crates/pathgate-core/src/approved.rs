//! Approval-time identity snapshots and their re-verification.
//!
//! # Protection Strategy
//!
//! When an operator approves a path, [`ApprovedPath::capture`] records what
//! the path named at that moment:
//! - existing targets: the (device, inode) of the object itself, taken
//!   without following a final symlink;
//! - new targets: nothing for the target, and the identity of the parent
//!   directory is the sole anchor.
//!
//! The parent identity is recorded in both cases. At execution time
//! [`ApprovedPath::verify`] re-queries the filesystem and classifies any drift;
//! the atomic open/create primitives in [`crate::open`] then close the
//! remaining gap with `O_NOFOLLOW`, `O_EXCL` and an `fstat` of the handle.

use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::config::GuardOptions;
use crate::error::VerifyError;
use crate::identity::FileIdentity;
use crate::netfs::is_network_filesystem;
use crate::path::{dirname, resolve_path};

/// Filesystem state of a path at approval time.
///
/// Only [`ApprovedPath::capture`] builds one, so a value always carries a
/// resolved path and a parent identity. The snapshot is immutable: verifying
/// or opening through it any number of times never changes it.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct ApprovedPath {
    user_path: PathBuf,
    resolved_path: PathBuf,
    parent_path: PathBuf,
    existed: bool,
    is_symlink: bool,
    identity: FileIdentity,
    parent_identity: FileIdentity,
    is_network_fs: bool,
}

impl ApprovedPath {
    /// Captures `path` with default options.
    pub fn capture(path: impl AsRef<Path>) -> Result<Self, VerifyError> {
        Self::capture_with(path, &GuardOptions::default())
    }

    /// Captures `path`.
    ///
    /// # Errors
    ///
    /// - [`VerifyError::InvalidPath`] for an empty path, or a trailing `/`
    ///   on anything but an existing directory.
    /// - [`VerifyError::Parent`] when the parent chain cannot be resolved or
    ///   the containing directory cannot be queried.
    pub fn capture_with(path: impl AsRef<Path>, options: &GuardOptions) -> Result<Self, VerifyError> {
        capture_inner(path.as_ref(), options)
    }

    /// Re-checks the filesystem against this snapshot.
    ///
    /// For a target that existed, its current identity must match; for a new
    /// target, the parent directory's identity must match. Whether a new
    /// target has appeared meanwhile is left to the create call.
    #[instrument(level = "debug", skip_all, fields(path = %self.resolved_path.display(), existed = self.existed))]
    pub fn verify(&self) -> Result<(), VerifyError> {
        if self.existed {
            self.verify_target()
        } else {
            self.verify_parent()
        }
    }

    fn verify_target(&self) -> Result<(), VerifyError> {
        let path = &self.resolved_path;
        let (actual, meta) = match FileIdentity::of_link(path) {
            Ok(found) => found,
            Err(e) if is_gone(&e) => {
                warn!(path = %path.display(), "Approved file was deleted");
                return Err(VerifyError::Deleted { path: path.clone() });
            }
            Err(source) => {
                return Err(VerifyError::Open {
                    path: path.clone(),
                    source,
                });
            }
        };

        if meta.file_type().is_symlink() && !self.is_symlink {
            warn!(path = %path.display(), "Approved file was replaced by a symlink");
            return Err(VerifyError::Symlink { path: path.clone() });
        }

        if actual != self.identity {
            warn!(
                path = %path.display(),
                expected = %self.identity,
                actual = %actual,
                "Approved file identity changed"
            );
            return Err(VerifyError::InodeMismatch {
                path: path.clone(),
                expected: self.identity,
                actual,
            });
        }

        trace!("Target identity unchanged");
        Ok(())
    }

    fn verify_parent(&self) -> Result<(), VerifyError> {
        let path = &self.parent_path;
        match FileIdentity::of_path(path) {
            Ok(actual) if actual == self.parent_identity => {
                trace!("Parent identity unchanged");
                Ok(())
            }
            Ok(actual) => {
                warn!(
                    path = %path.display(),
                    expected = %self.parent_identity,
                    actual = %actual,
                    "Parent directory identity changed"
                );
                Err(VerifyError::ParentChanged { path: path.clone() })
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Parent directory is no longer accessible");
                Err(VerifyError::ParentChanged { path: path.clone() })
            }
        }
    }

    /// The path as supplied by the caller.
    pub fn user_path(&self) -> &Path {
        &self.user_path
    }

    /// Absolute path resolved at capture time; the target of open/create.
    pub fn resolved_path(&self) -> &Path {
        &self.resolved_path
    }

    /// Absolute path of the containing directory.
    pub fn parent_path(&self) -> &Path {
        &self.parent_path
    }

    /// Whether the target existed at capture time.
    pub fn existed(&self) -> bool {
        self.existed
    }

    /// Whether the captured target was itself a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.is_symlink
    }

    /// Target identity; [`FileIdentity::ZERO`] when the target did not exist.
    pub fn identity(&self) -> FileIdentity {
        self.identity
    }

    pub fn inode(&self) -> u64 {
        self.identity.inode
    }

    pub fn device(&self) -> u64 {
        self.identity.device
    }

    /// Parent directory identity; always set.
    pub fn parent_identity(&self) -> FileIdentity {
        self.parent_identity
    }

    pub fn parent_inode(&self) -> u64 {
        self.parent_identity.inode
    }

    pub fn parent_device(&self) -> u64 {
        self.parent_identity.device
    }

    /// Advisory: the path appeared to live on a network filesystem, where
    /// identity guarantees are weaker.
    pub fn is_network_fs(&self) -> bool {
        self.is_network_fs
    }
}

#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
fn capture_inner(path: &Path, options: &GuardOptions) -> Result<ApprovedPath, VerifyError> {
    if path.as_os_str().is_empty() {
        return Err(VerifyError::invalid(path, "empty path"));
    }

    let resolved_path = resolve_path(path, false).map_err(|source| {
        debug!(error = %source, "Cannot resolve parent chain");
        VerifyError::Parent {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let parent_path = PathBuf::from(dirname(&resolved_path));

    let (target, identity) = match FileIdentity::of_link(&resolved_path) {
        Ok((identity, meta)) => (Some(meta.file_type()), identity),
        Err(e) if e.kind() == io::ErrorKind::NotFound => (None, FileIdentity::ZERO),
        Err(source) => {
            debug!(error = %source, "Cannot query target");
            return Err(VerifyError::Parent {
                path: parent_path,
                source,
            });
        }
    };

    // "name/" only ever names a directory; resolution drops the separator
    if has_trailing_separator(path) && !target.is_some_and(|t| t.is_dir()) {
        return Err(VerifyError::invalid(path, "trailing separator on a non-directory"));
    }
    let existed = target.is_some();
    let is_symlink = target.is_some_and(|t| t.is_symlink());

    let parent_identity = FileIdentity::of_path(&parent_path).map_err(|source| {
        debug!(error = %source, "Cannot query parent directory");
        VerifyError::Parent {
            path: parent_path.clone(),
            source,
        }
    })?;

    let is_network_fs = options.detect_network_fs && is_network_filesystem(&resolved_path);
    if is_network_fs {
        warn!(
            path = %resolved_path.display(),
            "Path is on a network filesystem; identity verification is less reliable"
        );
    }

    debug!(
        resolved = %resolved_path.display(),
        existed,
        identity = %identity,
        parent_identity = %parent_identity,
        "Captured approved path"
    );

    Ok(ApprovedPath {
        user_path: path.to_path_buf(),
        resolved_path,
        parent_path,
        existed,
        is_symlink,
        identity,
        parent_identity,
        is_network_fs,
    })
}

fn has_trailing_separator(path: &Path) -> bool {
    path.as_os_str().as_bytes().ends_with(b"/")
}

/// Errors that mean "no longer there": the entry or a path component vanished.
fn is_gone(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// Captures `path` with default options. See [`ApprovedPath::capture`].
pub fn capture_approved_path(path: impl AsRef<Path>) -> Result<ApprovedPath, VerifyError> {
    ApprovedPath::capture(path)
}

/// Verifies `approved` against the filesystem. See [`ApprovedPath::verify`].
pub fn verify_approved_path(approved: &ApprovedPath) -> Result<(), VerifyError> {
    approved.verify()
}
