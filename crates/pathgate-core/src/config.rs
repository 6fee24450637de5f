//! Options that tune capture and open behaviour.

use serde::Deserialize;

/// Permission bits for files created through a verify-and-open on a target
/// that did not exist at approval time.
pub const DEFAULT_CREATE_MODE: u32 = 0o644;

/// Behavioural knobs for capture and the verified-file context.
///
/// Every field has a default, so a partial TOML table deserializes cleanly:
///
/// ```
/// use pathgate_core::GuardOptions;
///
/// let options: GuardOptions = serde_json::from_str(r#"{"detect_network_fs": false}"#).unwrap();
/// assert!(!options.detect_network_fs);
/// assert_eq!(options.default_create_mode, 0o644);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuardOptions {
    /// Mode for files created by a verify-and-open of a new target.
    pub default_create_mode: u32,
    /// Probe the mount table at capture time and flag network filesystems.
    pub detect_network_fs: bool,
    /// Let [`crate::VerifiedFileContext::open`] fall back to a plain
    /// no-follow open when no snapshot is set.
    pub allow_unverified_fallback: bool,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            default_create_mode: DEFAULT_CREATE_MODE,
            detect_network_fs: true,
            allow_unverified_fallback: false,
        }
    }
}

impl GuardOptions {
    /// Strict options: no fallback, network detection on.
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn with_create_mode(mut self, mode: u32) -> Self {
        self.default_create_mode = mode;
        self
    }

    pub fn with_network_detection(mut self, enabled: bool) -> Self {
        self.detect_network_fs = enabled;
        self
    }

    pub fn with_unverified_fallback(mut self, enabled: bool) -> Self {
        self.allow_unverified_fallback = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = GuardOptions::default();
        assert_eq!(options.default_create_mode, 0o644);
        assert!(options.detect_network_fs);
        assert!(!options.allow_unverified_fallback);
        assert_eq!(GuardOptions::strict(), options);
    }

    #[test]
    fn test_builders() {
        let options = GuardOptions::default()
            .with_create_mode(0o600)
            .with_network_detection(false)
            .with_unverified_fallback(true);
        assert_eq!(options.default_create_mode, 0o600);
        assert!(!options.detect_network_fs);
        assert!(options.allow_unverified_fallback);
    }

    #[test]
    fn test_partial_deserialize() {
        let options: GuardOptions =
            serde_json::from_str(r#"{"allow_unverified_fallback": true}"#).unwrap();
        assert!(options.allow_unverified_fallback);
        assert!(options.detect_network_fs);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<GuardOptions, _> = serde_json::from_str(r#"{"follow_symlinks": true}"#);
        assert!(result.is_err());
    }
}
