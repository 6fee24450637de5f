//! Verification fused with the filesystem call that acts on it.
//!
//! Verification alone leaves a window between the check and the open. The
//! functions here shrink that window to the open itself:
//!
//! - existing targets are opened with `O_NOFOLLOW`, then the handle is
//!   `fstat`ed and compared to the approved identity before anything else
//!   (including truncation) happens;
//! - new targets are created with `openat(2)` relative to a directory handle
//!   whose identity has just been checked, with `O_CREAT | O_EXCL`, so a
//!   renamed or swapped parent and a pre-planted target are both refused.

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::OpenOptionsExt;

use tracing::{debug, instrument, warn};

use crate::approved::ApprovedPath;
use crate::config::{DEFAULT_CREATE_MODE, GuardOptions};
use crate::error::VerifyError;
use crate::identity::FileIdentity;
use crate::path::basename;

/// How the file is accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

/// Access mode plus modifiers for a verified open or create.
///
/// `O_CREAT`, `O_EXCL`, `O_NOFOLLOW` and `O_CLOEXEC` are never set here; the
/// open/create primitives add them as appropriate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    access: AccessMode,
    append: bool,
    truncate: bool,
}

impl OpenFlags {
    pub const fn read() -> Self {
        Self::new(AccessMode::Read)
    }

    pub const fn write() -> Self {
        Self::new(AccessMode::Write)
    }

    pub const fn read_write() -> Self {
        Self::new(AccessMode::ReadWrite)
    }

    pub const fn new(access: AccessMode) -> Self {
        Self {
            access,
            append: false,
            truncate: false,
        }
    }

    /// Writes go to the end of the file.
    #[must_use]
    pub const fn with_append(mut self) -> Self {
        self.append = true;
        self
    }

    /// Truncate an existing file, after its identity has been confirmed.
    #[must_use]
    pub const fn with_truncate(mut self) -> Self {
        self.truncate = true;
        self
    }

    pub fn access(self) -> AccessMode {
        self.access
    }

    pub fn append(self) -> bool {
        self.append
    }

    pub fn truncate(self) -> bool {
        self.truncate
    }

    fn readable(self) -> bool {
        matches!(self.access, AccessMode::Read | AccessMode::ReadWrite)
    }

    fn writable(self) -> bool {
        matches!(self.access, AccessMode::Write | AccessMode::ReadWrite)
    }

    /// Raw `open(2)` access bits, without creation or safety flags.
    pub fn to_libc(self) -> libc::c_int {
        let mut flags = match self.access {
            AccessMode::Read => libc::O_RDONLY,
            AccessMode::Write => libc::O_WRONLY,
            AccessMode::ReadWrite => libc::O_RDWR,
        };
        if self.append {
            flags |= libc::O_APPEND;
        }
        flags
    }

    /// Options for a no-follow open of an existing file. Never sets
    /// `O_TRUNC`; truncation happens after the `fstat` check.
    fn no_follow_options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options
            .read(self.readable())
            .write(self.writable() && !self.append)
            .append(self.append)
            .custom_flags(libc::O_NOFOLLOW | libc::O_CLOEXEC);
        options
    }
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self::read()
    }
}

/// Verifies `approved` and opens it in one step, with the default create mode
/// for targets that did not exist at approval time.
pub fn verify_and_open_approved_path(
    approved: &ApprovedPath,
    flags: OpenFlags,
) -> Result<File, VerifyError> {
    verify_and_open_with(approved, flags, DEFAULT_CREATE_MODE)
}

/// As [`verify_and_open_approved_path`], using `options.default_create_mode`.
pub fn verify_and_open_with_options(
    approved: &ApprovedPath,
    flags: OpenFlags,
    options: &GuardOptions,
) -> Result<File, VerifyError> {
    verify_and_open_with(approved, flags, options.default_create_mode)
}

#[instrument(level = "debug", skip_all, fields(path = %approved.resolved_path().display(), flags = ?flags))]
fn verify_and_open_with(
    approved: &ApprovedPath,
    flags: OpenFlags,
    create_mode: u32,
) -> Result<File, VerifyError> {
    if !approved.existed() {
        debug!("Target absent at approval, creating");
        return create_file_in_verified_parent(approved, flags, create_mode);
    }

    approved.verify()?;

    let path = approved.resolved_path();
    let file = flags
        .no_follow_options()
        .open(path)
        .map_err(|source| classify_open_error(approved, source))?;

    let actual = FileIdentity::of_file(&file).map_err(|source| VerifyError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    if actual != approved.identity() {
        warn!(
            path = %path.display(),
            expected = %approved.identity(),
            actual = %actual,
            "File swapped between verification and open"
        );
        return Err(VerifyError::InodeMismatch {
            path: path.to_path_buf(),
            expected: approved.identity(),
            actual,
        });
    }

    if flags.truncate() {
        file.set_len(0).map_err(|source| VerifyError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    }

    debug!("Opened verified file");
    Ok(file)
}

/// Creates the approved (new) file inside its verified parent directory.
///
/// # Errors
///
/// - any verification failure, unchanged;
/// - [`VerifyError::AlreadyExists`] if the target existed at approval or
///   appeared since (nothing is created in either case);
/// - [`VerifyError::ParentChanged`] if the parent handle does not match;
/// - [`VerifyError::Open`] for other OS failures.
#[instrument(level = "debug", skip_all, fields(path = %approved.resolved_path().display(), mode = %format!("{mode:o}")))]
pub fn create_file_in_verified_parent(
    approved: &ApprovedPath,
    flags: OpenFlags,
    mode: u32,
) -> Result<File, VerifyError> {
    approved.verify()?;

    let path = approved.resolved_path();
    if approved.existed() {
        warn!(path = %path.display(), "Refusing to create a file that existed at approval");
        return Err(VerifyError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }

    let parent = open_verified_parent(approved)?;
    let leaf = CString::new(basename(path).as_bytes())
        .map_err(|_| VerifyError::invalid(path, "path contains a NUL byte"))?;
    let oflags = flags.to_libc() | libc::O_CREAT | libc::O_EXCL | libc::O_NOFOLLOW | libc::O_CLOEXEC;

    // SAFETY: `parent` is an open directory descriptor owned for the whole
    // call and `leaf` is a NUL-terminated string that outlives it. The mode
    // argument is passed with its promoted variadic type.
    let fd = unsafe {
        libc::openat(
            parent.as_raw_fd(),
            leaf.as_ptr(),
            oflags,
            libc::c_uint::from(mode),
        )
    };
    if fd < 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EEXIST) {
            warn!(path = %path.display(), "Target appeared after approval");
            return Err(VerifyError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        return Err(VerifyError::Open {
            path: path.to_path_buf(),
            source: err,
        });
    }

    // SAFETY: `openat` succeeded, so `fd` is a fresh descriptor owned by no
    // one else.
    let file = unsafe { File::from_raw_fd(fd) };
    debug!("Created file in verified parent");
    Ok(file)
}

/// Opens the approved path's parent directory and checks its identity.
///
/// The returned descriptor pins the directory that was approved; later
/// `*at` calls relative to it cannot be redirected by renaming the path.
pub fn open_verified_parent(approved: &ApprovedPath) -> Result<OwnedFd, VerifyError> {
    let path = approved.parent_path();
    let changed = || VerifyError::ParentChanged {
        path: path.to_path_buf(),
    };

    let dir = OpenOptions::new()
        .read(true)
        .custom_flags(parent_open_flags())
        .open(path)
        .map_err(|e| {
            warn!(path = %path.display(), error = %e, "Cannot open parent directory");
            changed()
        })?;

    let actual = FileIdentity::of_file(&dir).map_err(|e| {
        warn!(path = %path.display(), error = %e, "Cannot stat parent directory");
        changed()
    })?;
    if actual != approved.parent_identity() {
        warn!(
            path = %path.display(),
            expected = %approved.parent_identity(),
            actual = %actual,
            "Parent directory swapped before create"
        );
        return Err(changed());
    }

    Ok(OwnedFd::from(dir))
}

/// `O_PATH` on Linux so that a write-only (non-listable) parent still works.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn parent_open_flags() -> libc::c_int {
    libc::O_DIRECTORY | libc::O_CLOEXEC | libc::O_PATH
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn parent_open_flags() -> libc::c_int {
    libc::O_DIRECTORY | libc::O_CLOEXEC
}

fn classify_open_error(approved: &ApprovedPath, source: io::Error) -> VerifyError {
    let path = approved.resolved_path().to_path_buf();
    match source.raw_os_error() {
        Some(code) if is_no_follow_errno(code) => {
            warn!(path = %path.display(), "Open refused: final component is a symlink");
            VerifyError::Symlink { path }
        }
        Some(libc::ENOENT) => {
            warn!(path = %path.display(), "File vanished between verification and open");
            VerifyError::Deleted { path }
        }
        _ => VerifyError::Open { path, source },
    }
}

/// Errno values an `O_NOFOLLOW` open returns for a final symlink.
#[cfg(any(target_os = "freebsd", target_os = "dragonfly"))]
const NO_FOLLOW_ERRNOS: &[i32] = &[libc::ELOOP, libc::EMLINK];
#[cfg(not(any(target_os = "freebsd", target_os = "dragonfly")))]
const NO_FOLLOW_ERRNOS: &[i32] = &[libc::ELOOP];

fn is_no_follow_errno(code: i32) -> bool {
    NO_FOLLOW_ERRNOS.contains(&code)
}
