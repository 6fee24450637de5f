//! Hands an approved snapshot from the approval step to tool execution.
//!
//! The approval layer [`set`](VerifiedFileContext::set)s the snapshot, and the
//! tool that performs the I/O calls [`open`](VerifiedFileContext::open) with the
//! path it was asked to touch. The context is an ordinary owned value: pass it
//! (or a `&mut` to it) to whoever executes the tool.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::approved::ApprovedPath;
use crate::config::GuardOptions;
use crate::error::VerifyError;
use crate::identity::FileIdentity;
use crate::open::{OpenFlags, verify_and_open_with_options};
use crate::path::resolve_path;

/// What the tool intends to do with the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifiedFileMode {
    Read,
    /// Write from the start, truncating an existing file; creates a new one.
    Write,
    Append,
    ReadWrite,
}

impl VerifiedFileMode {
    pub fn flags(self) -> OpenFlags {
        match self {
            VerifiedFileMode::Read => OpenFlags::read(),
            VerifiedFileMode::Write => OpenFlags::write().with_truncate(),
            VerifiedFileMode::Append => OpenFlags::write().with_append(),
            VerifiedFileMode::ReadWrite => OpenFlags::read_write(),
        }
    }
}

/// Holds at most one approved snapshot for the operation in progress.
#[derive(Debug, Default)]
pub struct VerifiedFileContext {
    approved: Option<ApprovedPath>,
    options: GuardOptions,
}

impl VerifiedFileContext {
    pub fn new(options: GuardOptions) -> Self {
        Self {
            approved: None,
            options,
        }
    }

    /// Installs `approved`, replacing (and dropping) any previous snapshot.
    pub fn set(&mut self, approved: ApprovedPath) {
        debug!(path = %approved.resolved_path().display(), "Verified file context set");
        self.approved = Some(approved);
    }

    /// Drops the current snapshot, if any.
    pub fn clear(&mut self) {
        if self.approved.take().is_some() {
            debug!("Verified file context cleared");
        }
    }

    /// Removes and returns the current snapshot.
    pub fn take(&mut self) -> Option<ApprovedPath> {
        self.approved.take()
    }

    pub fn is_set(&self) -> bool {
        self.approved.is_some()
    }

    pub fn approved(&self) -> Option<&ApprovedPath> {
        self.approved.as_ref()
    }

    pub fn resolved_path(&self) -> Option<&Path> {
        self.approved.as_ref().map(ApprovedPath::resolved_path)
    }

    pub fn options(&self) -> &GuardOptions {
        &self.options
    }

    /// Returns true if `requested` names the approved path: literally (user
    /// or resolved form) or after resolution.
    pub fn path_matches(&self, requested: impl AsRef<Path>) -> bool {
        let Some(approved) = &self.approved else {
            return false;
        };
        let requested = requested.as_ref();
        if requested == approved.user_path() || requested == approved.resolved_path() {
            return true;
        }
        resolve_path(requested, false).is_ok_and(|resolved| resolved == approved.resolved_path())
    }

    /// Opens `requested` through the approved snapshot.
    ///
    /// # Errors
    ///
    /// - No snapshot set: [`VerifyError::InvalidPath`], unless the options
    ///   allow an unverified (still no-follow) open.
    /// - `requested` is not the approved path: [`VerifyError::InodeMismatch`].
    /// - Otherwise whatever the verified open reports.
    #[instrument(level = "debug", skip_all, fields(path = %requested.as_ref().display(), mode = ?mode))]
    pub fn open(&self, requested: impl AsRef<Path>, mode: VerifiedFileMode) -> Result<File, VerifyError> {
        let requested = requested.as_ref();
        let Some(approved) = &self.approved else {
            return self.open_unverified(requested, mode);
        };

        if !self.path_matches(requested) {
            warn!(
                requested = %requested.display(),
                approved = %approved.resolved_path().display(),
                "Requested path does not match the approved path"
            );
            return Err(VerifyError::InodeMismatch {
                path: requested.to_path_buf(),
                expected: approved.identity(),
                actual: FileIdentity::ZERO,
            });
        }

        verify_and_open_with_options(approved, mode.flags(), &self.options)
    }

    fn open_unverified(&self, requested: &Path, mode: VerifiedFileMode) -> Result<File, VerifyError> {
        if !self.options.allow_unverified_fallback {
            return Err(VerifyError::invalid(requested, "no approved path in context"));
        }

        warn!(path = %requested.display(), "Opening without an approved snapshot");
        let mut options = OpenOptions::new();
        match mode {
            VerifiedFileMode::Read => options.read(true),
            VerifiedFileMode::Write => options.write(true).create(true).truncate(true),
            VerifiedFileMode::Append => options.append(true).create(true),
            VerifiedFileMode::ReadWrite => options.read(true).write(true),
        };
        options
            .mode(self.options.default_create_mode)
            .custom_flags(libc::O_NOFOLLOW | libc::O_CLOEXEC)
            .open(requested)
            .map_err(|source| VerifyError::Open {
                path: requested.to_path_buf(),
                source,
            })
    }
}
