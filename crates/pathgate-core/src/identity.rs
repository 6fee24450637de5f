//! Filesystem object identity as a (device, inode) pair.

use std::fmt;
use std::fs::{self, File, Metadata};
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use serde::Serialize;

/// Identity of a filesystem object on this machine at a point in time.
///
/// Two paths name the same object iff their identities are equal. An
/// identity can be reused by the OS after the object is deleted; this is an
/// inherent limitation of inode-based identity and is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct FileIdentity {
    /// Device ID (`st_dev`).
    pub device: u64,
    /// Inode number (`st_ino`).
    pub inode: u64,
}

impl FileIdentity {
    /// The unset identity recorded for targets that did not exist.
    pub const ZERO: FileIdentity = FileIdentity {
        device: 0,
        inode: 0,
    };

    pub fn new(device: u64, inode: u64) -> Self {
        Self { device, inode }
    }

    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            device: meta.dev(),
            inode: meta.ino(),
        }
    }

    /// Identity of the object `path` names, without following a final symlink.
    pub fn of_link(path: &Path) -> io::Result<(Self, Metadata)> {
        let meta = fs::symlink_metadata(path)?;
        Ok((Self::from_metadata(&meta), meta))
    }

    /// Identity of the object `path` resolves to, following symlinks.
    pub fn of_path(path: &Path) -> io::Result<Self> {
        fs::metadata(path).map(|meta| Self::from_metadata(&meta))
    }

    /// Identity of an open handle (`fstat`).
    pub fn of_file(file: &File) -> io::Result<Self> {
        file.metadata().map(|meta| Self::from_metadata(&meta))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev {} ino {}", self.device, self.inode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_same_file_same_identity() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"a").unwrap();

        let by_path = FileIdentity::of_path(&path).unwrap();
        let (by_link, _) = FileIdentity::of_link(&path).unwrap();
        let by_handle = FileIdentity::of_file(&File::open(&path).unwrap()).unwrap();

        assert_eq!(by_path, by_link);
        assert_eq!(by_path, by_handle);
        assert!(!by_path.is_zero());
    }

    #[test]
    fn test_distinct_files_distinct_identity() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();

        assert_ne!(
            FileIdentity::of_path(&a).unwrap(),
            FileIdentity::of_path(&b).unwrap()
        );
    }

    #[test]
    fn test_link_identity_differs_from_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target");
        let link = dir.path().join("link");
        fs::write(&target, b"t").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let (link_id, meta) = FileIdentity::of_link(&link).unwrap();
        assert!(meta.file_type().is_symlink());
        assert_ne!(link_id, FileIdentity::of_path(&link).unwrap());
        assert_eq!(
            FileIdentity::of_path(&link).unwrap(),
            FileIdentity::of_path(&target).unwrap()
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(FileIdentity::new(3, 42).to_string(), "dev 3 ino 42");
        assert!(FileIdentity::default().is_zero());
    }
}
