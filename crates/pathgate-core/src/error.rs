//! Verification outcomes and their rendering.
//!
//! [`VerifyStatus`] is the closed, stably-numbered outcome enumeration that
//! policy code branches on. [`VerifyError`] is the failure side of every
//! fallible operation in this crate and always maps back to exactly one
//! non-OK status via [`VerifyError::status`].

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::identity::FileIdentity;

/// Outcome of a capture, verify, open or create operation.
///
/// The discriminants are part of the public contract: callers persist and
/// branch on them, so existing values must never be renumbered.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerifyStatus {
    /// Path verified successfully.
    Ok = 0,
    /// Empty or malformed path, or no snapshot to verify against.
    InvalidPath = 1,
    /// The containing directory was missing or inaccessible at capture time.
    Parent = 2,
    /// The final path component is a symbolic link.
    Symlink = 3,
    /// The target was deleted after approval.
    Deleted = 4,
    /// The target's (device, inode) pair changed after approval.
    InodeMismatch = 5,
    /// The parent directory disappeared or was replaced after approval.
    ParentChanged = 6,
    /// The target exists although it was approved for creation.
    AlreadyExists = 7,
    /// The open/create call failed for an OS reason unrelated to identity.
    Open = 8,
}

impl VerifyStatus {
    /// Every status, in discriminant order.
    pub const ALL: [VerifyStatus; 9] = [
        VerifyStatus::Ok,
        VerifyStatus::InvalidPath,
        VerifyStatus::Parent,
        VerifyStatus::Symlink,
        VerifyStatus::Deleted,
        VerifyStatus::InodeMismatch,
        VerifyStatus::ParentChanged,
        VerifyStatus::AlreadyExists,
        VerifyStatus::Open,
    ];

    /// Fixed human-readable description.
    pub fn message(self) -> &'static str {
        match self {
            VerifyStatus::Ok => "Path verified successfully",
            VerifyStatus::InvalidPath => "Invalid or malformed path",
            VerifyStatus::Parent => "Cannot access parent directory",
            VerifyStatus::Symlink => "Path is a symlink (not allowed for security)",
            VerifyStatus::Deleted => "File was deleted after approval",
            VerifyStatus::InodeMismatch => "File changed since approval (inode mismatch)",
            VerifyStatus::ParentChanged => "Parent directory changed since approval",
            VerifyStatus::AlreadyExists => "File already exists",
            VerifyStatus::Open => "Failed to open file",
        }
    }

    /// Stable symbolic code used as the `error` key of the JSON object.
    pub fn code(self) -> &'static str {
        match self {
            VerifyStatus::Ok => "ok",
            VerifyStatus::InvalidPath => "invalid_path",
            VerifyStatus::Parent => "parent_unavailable",
            VerifyStatus::Symlink => "symlink_rejected",
            VerifyStatus::Deleted => "file_deleted",
            VerifyStatus::InodeMismatch | VerifyStatus::ParentChanged => "path_changed",
            VerifyStatus::AlreadyExists => "file_exists",
            VerifyStatus::Open => "open_failed",
        }
    }

    /// Returns true for race/tamper detections.
    ///
    /// These are security events: they are reported verbatim and a fresh
    /// capture is required before any retry.
    pub fn is_tamper(self) -> bool {
        matches!(
            self,
            VerifyStatus::Symlink
                | VerifyStatus::Deleted
                | VerifyStatus::InodeMismatch
                | VerifyStatus::ParentChanged
                | VerifyStatus::AlreadyExists
        )
    }

    /// Looks a status up by its stable discriminant.
    pub fn from_repr(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }
}

impl fmt::Display for VerifyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Serialize for VerifyStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// Failure of a capture, verify, open or create operation.
///
/// Every variant corresponds to one non-OK [`VerifyStatus`].
#[derive(Error, Debug)]
pub enum VerifyError {
    // =========================================================================
    // INPUT-CONTRACT VIOLATIONS - programming errors in the caller
    // =========================================================================
    /// The path was empty or malformed, or no snapshot was available.
    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: PathBuf, reason: &'static str },

    // =========================================================================
    // ENVIRONMENT ERRORS - the path cannot be approved
    // =========================================================================
    /// The containing directory could not be resolved or queried at capture time.
    #[error("Cannot access parent directory of {path:?}: {source}")]
    Parent {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // =========================================================================
    // TAMPER DETECTIONS - never retried, re-approval required
    // =========================================================================
    /// The final component is a symbolic link.
    #[error("[TAMPER] {path:?} is a symlink (not allowed for security)")]
    Symlink { path: PathBuf },

    /// The approved file no longer exists.
    #[error("[TAMPER] {path:?} was deleted after approval")]
    Deleted { path: PathBuf },

    /// The path now names a different filesystem object.
    #[error("[TAMPER] {path:?} changed since approval (expected {expected}, found {actual})")]
    InodeMismatch {
        path: PathBuf,
        expected: FileIdentity,
        actual: FileIdentity,
    },

    /// The parent directory is gone or is a different directory.
    #[error("[TAMPER] parent directory {path:?} changed since approval")]
    ParentChanged { path: PathBuf },

    /// The target exists although it was approved as a new file.
    #[error("[TAMPER] {path:?} already exists")]
    AlreadyExists { path: PathBuf },

    // =========================================================================
    // OS ERRORS - permissions, resource limits
    // =========================================================================
    /// The open or create call failed for an unrelated OS reason.
    #[error("Failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl VerifyError {
    pub(crate) fn invalid(path: impl Into<PathBuf>, reason: &'static str) -> Self {
        VerifyError::InvalidPath {
            path: path.into(),
            reason,
        }
    }

    /// The status this error reports.
    pub fn status(&self) -> VerifyStatus {
        match self {
            VerifyError::InvalidPath { .. } => VerifyStatus::InvalidPath,
            VerifyError::Parent { .. } => VerifyStatus::Parent,
            VerifyError::Symlink { .. } => VerifyStatus::Symlink,
            VerifyError::Deleted { .. } => VerifyStatus::Deleted,
            VerifyError::InodeMismatch { .. } => VerifyStatus::InodeMismatch,
            VerifyError::ParentChanged { .. } => VerifyStatus::ParentChanged,
            VerifyError::AlreadyExists { .. } => VerifyStatus::AlreadyExists,
            VerifyError::Open { .. } => VerifyStatus::Open,
        }
    }

    /// The path the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            VerifyError::InvalidPath { path, .. }
            | VerifyError::Parent { path, .. }
            | VerifyError::Symlink { path }
            | VerifyError::Deleted { path }
            | VerifyError::InodeMismatch { path, .. }
            | VerifyError::ParentChanged { path }
            | VerifyError::AlreadyExists { path }
            | VerifyError::Open { path, .. } => path,
        }
    }

    /// See [`VerifyStatus::is_tamper`].
    pub fn is_tamper(&self) -> bool {
        self.status().is_tamper()
    }

    /// Renders this error as the JSON error object for machine consumers.
    pub fn to_json(&self) -> String {
        format_verify_error(self.status(), &self.path().to_string_lossy())
    }
}

/// Returns the human-readable message for `status`.
pub fn verify_result_message(status: VerifyStatus) -> &'static str {
    status.message()
}

/// Builds `{"error": "<code>", "message": "<text>", "path": "<path>"}`.
///
/// Only `\` and `"` in the path are escaped; every other character is copied
/// through unchanged.
pub fn format_verify_error(status: VerifyStatus, path: &str) -> String {
    format!(
        "{{\"error\": \"{}\", \"message\": \"{}\", \"path\": \"{}\"}}",
        status.code(),
        status.message(),
        escape_path(path)
    )
}

fn escape_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len() + 8);
    for c in path.chars() {
        if c == '\\' || c == '"' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminants_are_stable() {
        assert_eq!(VerifyStatus::Ok as u8, 0);
        assert_eq!(VerifyStatus::InvalidPath as u8, 1);
        assert_eq!(VerifyStatus::Parent as u8, 2);
        assert_eq!(VerifyStatus::Symlink as u8, 3);
        assert_eq!(VerifyStatus::Deleted as u8, 4);
        assert_eq!(VerifyStatus::InodeMismatch as u8, 5);
        assert_eq!(VerifyStatus::ParentChanged as u8, 6);
        assert_eq!(VerifyStatus::AlreadyExists as u8, 7);
        assert_eq!(VerifyStatus::Open as u8, 8);
    }

    #[test]
    fn test_from_repr_matches_discriminant() {
        for status in VerifyStatus::ALL {
            assert_eq!(VerifyStatus::from_repr(status as u8), Some(status));
        }
        assert_eq!(VerifyStatus::from_repr(9), None);
    }

    #[test]
    fn test_every_status_has_a_message() {
        for status in VerifyStatus::ALL {
            assert!(!verify_result_message(status).is_empty(), "{status:?}");
            assert!(!status.code().is_empty(), "{status:?}");
        }
    }

    #[test]
    fn test_tamper_classification() {
        assert!(VerifyStatus::Symlink.is_tamper());
        assert!(VerifyStatus::Deleted.is_tamper());
        assert!(VerifyStatus::InodeMismatch.is_tamper());
        assert!(VerifyStatus::ParentChanged.is_tamper());
        assert!(VerifyStatus::AlreadyExists.is_tamper());
        assert!(!VerifyStatus::Ok.is_tamper());
        assert!(!VerifyStatus::InvalidPath.is_tamper());
        assert!(!VerifyStatus::Parent.is_tamper());
        assert!(!VerifyStatus::Open.is_tamper());
    }

    #[test]
    fn test_format_verify_error_has_three_keys() {
        let json = format_verify_error(VerifyStatus::Symlink, "/test/path");
        assert!(json.contains("\"error\":"));
        assert!(json.contains("\"message\":"));
        assert!(json.contains("\"path\":"));
        assert!(json.contains("\"symlink_rejected\""));
        assert!(json.contains("/test/path"));

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let obj = parsed.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["message"], VerifyStatus::Symlink.message());
    }

    #[test]
    fn test_format_verify_error_escapes_quote() {
        let json = format_verify_error(VerifyStatus::Symlink, "/a/b\"c");
        assert!(json.contains("\\\"c"), "got: {json}");

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["path"], "/a/b\"c");
    }

    #[test]
    fn test_format_verify_error_escapes_backslash() {
        let json = format_verify_error(VerifyStatus::Open, "C:\\temp\\x");
        assert!(json.contains("C:\\\\temp\\\\x"), "got: {json}");
    }

    #[test]
    fn test_format_verify_error_passes_other_characters() {
        let json = format_verify_error(VerifyStatus::Deleted, "/tmp/ünï cødé/'x'");
        assert!(json.contains("/tmp/ünï cødé/'x'"));
    }

    #[test]
    fn test_path_changed_code_is_shared() {
        assert_eq!(VerifyStatus::InodeMismatch.code(), "path_changed");
        assert_eq!(VerifyStatus::ParentChanged.code(), "path_changed");
    }

    #[test]
    fn test_error_status_and_json() {
        let err = VerifyError::Deleted {
            path: PathBuf::from("/tmp/gone.txt"),
        };
        assert_eq!(err.status(), VerifyStatus::Deleted);
        assert!(err.is_tamper());
        assert!(err.to_json().contains("\"file_deleted\""));
        assert!(err.to_string().contains("deleted after approval"));
    }

    #[test]
    fn test_open_error_folds_os_error_into_message() {
        let err = VerifyError::Open {
            path: PathBuf::from("/tmp/locked"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.status(), VerifyStatus::Open);
        assert!(!err.is_tamper());
        assert!(err.to_string().to_lowercase().contains("permission denied"));
    }

    #[test]
    fn test_status_serializes_as_code() {
        let json = serde_json::to_string(&VerifyStatus::AlreadyExists).unwrap();
        assert_eq!(json, "\"file_exists\"");
    }
}
