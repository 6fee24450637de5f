//! Shared helpers for integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

use pathgate_core::{ApprovedPath, GuardOptions};
use tempfile::TempDir;

static TRACING: Once = Once::new();

/// Installs a test subscriber once per binary; `RUST_LOG` controls output.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Options for tests: skip the mount-table probe.
pub fn test_options() -> GuardOptions {
    GuardOptions::default().with_network_detection(false)
}

pub fn capture(path: &Path) -> ApprovedPath {
    ApprovedPath::capture_with(path, &test_options()).expect("capture failed")
}

/// A temp directory with one file of the given contents.
pub fn workspace_with_file(name: &str, contents: &[u8]) -> (TempDir, PathBuf) {
    init_tracing();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("Failed to write fixture");
    (dir, path)
}
