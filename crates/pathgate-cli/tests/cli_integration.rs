#![allow(deprecated)] // cargo_bin! macro doesn't exist yet in assert_cmd 2.1

use std::fs;
use std::os::unix::fs::symlink;
use std::thread;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn pathgate() -> Command {
    let mut cmd = Command::cargo_bin("pathgate").unwrap();
    cmd.env_remove("PATHGATE_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd
}

// =============================================================================
// capture
// =============================================================================

#[test]
fn test_capture_existing_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.txt");
    fs::write(&path, b"a").unwrap();

    let output = pathgate()
        .args(["capture", "--json"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["existed"], true);
    assert_eq!(json["is_symlink"], false);
    assert_ne!(json["identity"]["inode"], 0);
}

#[test]
fn test_capture_new_file_table() {
    let dir = TempDir::new().unwrap();

    pathgate()
        .arg("capture")
        .arg(dir.path().join("new.txt"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Resolved Path"))
        .stdout(predicate::str::contains("(new file)"));
}

#[test]
fn test_capture_missing_parent() {
    let dir = TempDir::new().unwrap();

    pathgate()
        .arg("capture")
        .arg(dir.path().join("missing").join("x.txt"))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Cannot access parent directory"));
}

// =============================================================================
// check
// =============================================================================

#[test]
fn test_check_unchanged() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("c.txt");
    fs::write(&path, b"c").unwrap();

    pathgate()
        .arg("check")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Path verified successfully"));
}

#[test]
fn test_check_detects_deletion_during_delay() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("d.txt");
    fs::write(&path, b"d").unwrap();

    let victim = path.clone();
    let attacker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        fs::remove_file(victim).unwrap();
    });

    pathgate()
        .args(["check", "--delay-ms", "2000"])
        .arg(&path)
        .assert()
        .code(3)
        .stdout(predicate::str::contains("\"error\": \"file_deleted\""));

    attacker.join().unwrap();
}

// =============================================================================
// cat / write
// =============================================================================

#[test]
fn test_cat_reads_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("r.txt");
    fs::write(&path, b"hello from disk").unwrap();

    pathgate()
        .arg("cat")
        .arg(&path)
        .assert()
        .success()
        .stdout("hello from disk");
}

#[test]
fn test_cat_refuses_symlink() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("secret.txt");
    let link = dir.path().join("link.txt");
    fs::write(&target, b"secret").unwrap();
    symlink(&target, &link).unwrap();

    pathgate()
        .arg("cat")
        .arg(&link)
        .assert()
        .code(3)
        .stdout(predicate::str::contains("secret").not());
}

#[test]
fn test_cat_missing_file() {
    let dir = TempDir::new().unwrap();

    pathgate()
        .arg("cat")
        .arg(dir.path().join("nope.txt"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_write_creates_new_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("w.txt");

    pathgate()
        .arg("write")
        .arg(&path)
        .write_stdin("from stdin")
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&path).unwrap(), "from stdin");
}

#[test]
fn test_write_truncates_and_appends() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("t.txt");
    fs::write(&path, b"old old old").unwrap();

    pathgate().arg("write").arg(&path).write_stdin("new").assert().success();
    assert_eq!(fs::read_to_string(&path).unwrap(), "new");

    pathgate()
        .args(["write", "--append"])
        .arg(&path)
        .write_stdin("er")
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&path).unwrap(), "newer");
}

#[test]
fn test_write_create_only_existing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("exists.txt");
    fs::write(&path, b"keep").unwrap();

    pathgate()
        .args(["write", "--create-only"])
        .arg(&path)
        .write_stdin("clobber")
        .assert()
        .code(3);

    assert_eq!(fs::read_to_string(&path).unwrap(), "keep");
}

// =============================================================================
// netfs / config / usage
// =============================================================================

#[test]
fn test_netfs_local_temp_dir() {
    let dir = TempDir::new().unwrap();

    pathgate()
        .args(["netfs", "--json"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"network\":false"));
}

#[test]
fn test_config_file_applies_create_mode() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let config = dir.path().join("pathgate.toml");
    fs::write(&config, "[guard]\ndefault_create_mode = 0o600\n").unwrap();
    let path = dir.path().join("private.txt");

    pathgate()
        .arg("--config")
        .arg(&config)
        .arg("write")
        .arg(&path)
        .write_stdin("private")
        .assert()
        .success();

    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode & !0o600, 0);
}

#[test]
fn test_invalid_config_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[guard]\nfollow_symlinks = true\n").unwrap();

    pathgate()
        .arg("--config")
        .arg(&config)
        .arg("netfs")
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid config file"));
}

#[test]
fn test_unknown_subcommand_is_usage_error() {
    pathgate().arg("frobnicate").assert().code(2);
}

#[test]
fn test_help_succeeds() {
    pathgate()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("capture"));
}
