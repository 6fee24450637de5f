//! Exit codes for the CLI.
//!
//! Scripts branch on these, so a detected race is distinguishable from an
//! ordinary failure.

/// Successful execution
pub const SUCCESS: u8 = 0;

/// General/unspecified error
pub const GENERAL_ERROR: u8 = 1;

/// Command-line usage error (bad arguments)
pub const USAGE_ERROR: u8 = 2;

/// The path was tampered with after approval (symlink, swap, deletion, ...)
pub const TAMPER_DETECTED: u8 = 3;

/// Verification failed for a non-tamper reason (bad path, parent, OS error)
pub const VERIFY_FAILED: u8 = 4;
