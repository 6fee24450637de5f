//! TOCTOU-safe access to operator-approved file paths.
//!
//! An autonomous tool asks to read or write a path; a human approves it; some
//! time later the tool performs the I/O. Anything can happen to the path in
//! between: the file can be deleted and recreated, swapped for a symlink to
//! a sensitive file, or its directory renamed away. This crate makes sure the
//! I/O touches the object that was approved, or nothing at all.
//!
//! # Protocol
//!
//! 1. **Capture** at approval time: [`ApprovedPath::capture`] records the
//!    (device, inode) identity of the target (or, for a new file, of its
//!    parent directory).
//! 2. **Verify and open** at execution time: [`verify_and_open_approved_path`]
//!    re-checks the identity, opens with `O_NOFOLLOW`, and confirms the
//!    handle with `fstat`. New files are created with
//!    [`create_file_in_verified_parent`], an `O_EXCL` `openat` relative to a
//!    verified directory handle.
//! 3. **Report**: every failure is a [`VerifyError`] mapping to a stable
//!    [`VerifyStatus`]; [`format_verify_error`] renders the JSON object the
//!    policy layer forwards.
//!
//! ```no_run
//! use pathgate_core::{ApprovedPath, OpenFlags, verify_and_open_approved_path};
//!
//! # fn main() -> Result<(), pathgate_core::VerifyError> {
//! let approved = ApprovedPath::capture("notes/todo.txt")?;
//! // ... operator confirms, time passes ...
//! let file = verify_and_open_approved_path(&approved, OpenFlags::read())?;
//! # drop(file);
//! # Ok(())
//! # }
//! ```
//!
//! # Non-goals
//!
//! Races inside the single open call itself, sandboxing and cross-process
//! locking are out of scope: drift is detected and refused, never repaired.

#[cfg(not(unix))]
compile_error!("pathgate-core requires a Unix platform (O_NOFOLLOW, openat, inode identity)");

pub mod approved;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod netfs;
pub mod open;
pub mod path;

pub use approved::{ApprovedPath, capture_approved_path, verify_approved_path};
pub use config::{DEFAULT_CREATE_MODE, GuardOptions};
pub use context::{VerifiedFileContext, VerifiedFileMode};
pub use error::{VerifyError, VerifyStatus, format_verify_error, verify_result_message};
pub use identity::FileIdentity;
pub use netfs::is_network_filesystem;
pub use open::{
    AccessMode, OpenFlags, create_file_in_verified_parent, open_verified_parent,
    verify_and_open_approved_path, verify_and_open_with_options,
};
pub use path::{basename, dirname, resolve_path};
