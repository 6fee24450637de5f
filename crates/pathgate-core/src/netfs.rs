//! Best-effort detection of network filesystems.
//!
//! On network mounts (NFS, SMB, sshfs, ...) the server may recycle or
//! virtualize inode numbers, so identity checks are weaker. Detection is
//! advisory only: it never blocks an operation and every failure reads as
//! "not a network filesystem".
//!
//! # Platform Support
//!
//! - **Linux**: most specific entry of `/proc/mounts`
//! - **macOS**: `statfs(2)` filesystem type name
//! - **Other**: always `false`

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

/// Filesystem type names treated as network filesystems (case-insensitive).
pub const NETWORK_FS_TYPES: &[&str] = &[
    "nfs",
    "nfs4",
    "cifs",
    "smbfs",
    "smb3",
    "afs",
    "9p",
    "ceph",
    "fuse.sshfs",
    "fuse.rclone",
    "davfs",
    "webdav",
    "afpfs",
];

/// Returns true if `fstype` names a network filesystem.
pub fn is_network_fstype(fstype: &str) -> bool {
    NETWORK_FS_TYPES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(fstype))
}

/// Returns true if `path` (or its nearest existing ancestor) is on a network
/// filesystem.
pub fn is_network_filesystem(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return false;
    }

    let Some(existing) = nearest_existing_ancestor(path) else {
        trace!(path = %path.display(), "No existing ancestor");
        return false;
    };

    match filesystem_type(&existing) {
        Ok(fstype) => {
            trace!(path = %existing.display(), fstype = %fstype, "Filesystem type");
            is_network_fstype(&fstype)
        }
        Err(e) => {
            debug!(path = %existing.display(), error = %e, "Cannot determine filesystem type");
            false
        }
    }
}

fn nearest_existing_ancestor(path: &Path) -> Option<PathBuf> {
    path.ancestors().find_map(|candidate| {
        let candidate = if candidate.as_os_str().is_empty() {
            Path::new(".")
        } else {
            candidate
        };
        fs::canonicalize(candidate).ok()
    })
}

/// One entry of the system mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Mount source (device, export or share).
    pub source: String,
    pub mountpoint: PathBuf,
    pub fstype: String,
}

impl MountEntry {
    pub fn is_network(&self) -> bool {
        is_network_fstype(&self.fstype)
    }
}

/// Picks the most specific mount containing `path`. Later entries win ties,
/// matching mount stacking order.
pub fn find_mount_for<'a>(mounts: &'a [MountEntry], path: &Path) -> Option<&'a MountEntry> {
    let mut best: Option<&MountEntry> = None;
    for mount in mounts.iter().filter(|m| path.starts_with(&m.mountpoint)) {
        let deeper = best.is_none_or(|b| {
            mount.mountpoint.components().count() >= b.mountpoint.components().count()
        });
        if deeper {
            best = Some(mount);
        }
    }
    best
}

#[cfg(target_os = "linux")]
fn filesystem_type(path: &Path) -> io::Result<String> {
    let mounts = mount_table()?;
    find_mount_for(&mounts, path)
        .map(|m| m.fstype.clone())
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no mount contains path"))
}

/// Reads the system mount table.
#[cfg(target_os = "linux")]
pub fn mount_table() -> io::Result<Vec<MountEntry>> {
    let raw = fs::read("/proc/mounts")?;
    Ok(String::from_utf8_lossy(&raw)
        .lines()
        .filter_map(parse_mount_line)
        .collect())
}

#[cfg(target_os = "macos")]
fn filesystem_type(path: &Path) -> io::Result<String> {
    use std::ffi::{CStr, CString};
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    // SAFETY: `statfs` is plain old data; all-zero is a valid bit pattern.
    let mut buf: libc::statfs = unsafe { std::mem::zeroed() };
    // SAFETY: `c_path` is NUL-terminated and `buf` is a valid, writable
    // `statfs` for the duration of the call.
    let rc = unsafe { libc::statfs(c_path.as_ptr(), &mut buf) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: the kernel NUL-terminates `f_fstypename` within its bounds.
    let name = unsafe { CStr::from_ptr(buf.f_fstypename.as_ptr()) };
    Ok(name.to_string_lossy().into_owned())
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn filesystem_type(_path: &Path) -> io::Result<String> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "filesystem type detection not supported on this platform",
    ))
}

/// Parses one `/proc/mounts` line:
/// `{source} {mountpoint} {fstype} {options} {dump} {pass}`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_mount_line(line: &str) -> Option<MountEntry> {
    let mut parts = line.split_whitespace();
    let source = parts.next()?;
    let mountpoint = parts.next()?;
    let fstype = parts.next()?;

    Some(MountEntry {
        source: unescape_mount_field(source),
        mountpoint: PathBuf::from(unescape_mount_field(mountpoint)),
        fstype: fstype.to_string(),
    })
}

/// Decodes the `\ooo` octal escapes the kernel uses for space, tab, newline
/// and backslash. Malformed escapes are kept literally.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn unescape_mount_field(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            let digits = bytes.get(i + 1..i + 4);
            let code = digits
                .filter(|d| d.iter().all(|b| (b'0'..=b'7').contains(b)))
                .and_then(|d| std::str::from_utf8(d).ok())
                .and_then(|d| u8::from_str_radix(d, 8).ok());
            if let Some(code) = code {
                out.push(code);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
