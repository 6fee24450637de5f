//! Path utilities: final component, containing directory, canonical form.
//!
//! `basename` and `dirname` are purely lexical and operate on the raw bytes
//! of the path, so non-UTF-8 paths are handled like any other.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

const SEP: u8 = b'/';

/// Returns the final component of `path`.
///
/// Trailing separators are ignored. An empty path yields `"."`, a path with
/// no separator is returned unchanged, and a path consisting only of
/// separators is returned as-is. The result borrows from `path`.
///
/// ```
/// use pathgate_core::path::basename;
///
/// assert_eq!(basename("/foo/bar/baz.txt"), "baz.txt");
/// assert_eq!(basename("/foo/bar/"), "bar");
/// assert_eq!(basename("file.txt"), "file.txt");
/// assert_eq!(basename(""), ".");
/// ```
pub fn basename<P: AsRef<OsStr> + ?Sized>(path: &P) -> &OsStr {
    let raw = path.as_ref();
    let bytes = raw.as_bytes();
    if bytes.is_empty() {
        return OsStr::new(".");
    }

    let end = match bytes.iter().rposition(|&b| b != SEP) {
        Some(last) => last + 1,
        // Root or all separators
        None => return raw,
    };

    let start = bytes[..end]
        .iter()
        .rposition(|&b| b == SEP)
        .map_or(0, |sep| sep + 1);

    OsStr::from_bytes(&bytes[start..end])
}

/// Returns the directory containing `path` as a new string.
///
/// ```
/// use pathgate_core::path::dirname;
///
/// assert_eq!(dirname("/foo/bar"), "/foo");
/// assert_eq!(dirname("/foo"), "/");
/// assert_eq!(dirname("foo/bar"), "foo");
/// assert_eq!(dirname("foo"), ".");
/// assert_eq!(dirname("/"), "/");
/// assert_eq!(dirname(""), ".");
/// ```
pub fn dirname<P: AsRef<OsStr> + ?Sized>(path: &P) -> OsString {
    let bytes = path.as_ref().as_bytes();
    if bytes.is_empty() {
        return OsString::from(".");
    }

    // Strip trailing separators, keeping at least one byte for the root
    let mut len = bytes.len();
    while len > 1 && bytes[len - 1] == SEP {
        len -= 1;
    }
    let trimmed = &bytes[..len];

    match trimmed.iter().rposition(|&b| b == SEP) {
        None => OsString::from("."),
        Some(0) => OsString::from("/"),
        Some(idx) => OsString::from_vec(trimmed[..idx].to_vec()),
    }
}

/// Resolves `path` to an absolute, symlink-free form.
///
/// With `must_exist`, every component must exist. Otherwise only the parent
/// chain must resolve: the result is the canonical parent joined with the
/// (unresolved) final component, so a final symlink is *not* followed.
/// A final component of `.` or `..`, or a root-only path, is always resolved
/// as a whole. Trailing separators are dropped from the final component, so
/// callers that care whether `name/` is a directory must check it themselves.
pub fn resolve_path(path: &Path, must_exist: bool) -> io::Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty path"));
    }

    if must_exist {
        return fs::canonicalize(path);
    }

    let leaf = basename(path);
    let leaf_bytes = leaf.as_bytes();
    if leaf_bytes == b"." || leaf_bytes == b".." || leaf_bytes.iter().all(|&b| b == SEP) {
        return fs::canonicalize(path);
    }

    let parent = fs::canonicalize(dirname(path))?;
    if !parent.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("{} is not a directory", parent.display()),
        ));
    }

    Ok(parent.join(leaf))
}


/// Property-based tests using proptest.
#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;
    use std::path::Component;

    fn segment() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_.-]{1,8}".prop_filter("not a dot segment", |s| s != "." && s != "..")
    }

    fn normal_components(path: &Path) -> Vec<Component<'_>> {
        path.components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    }

    proptest! {
        /// Joining dirname and basename reconstructs an equivalent path.
        #[test]
        fn dirname_basename_reconstruct(
            absolute in any::<bool>(),
            segments in prop::collection::vec(segment(), 1..6),
            trailing in any::<bool>(),
        ) {
            let mut path = segments.join("/");
            if absolute {
                path.insert(0, '/');
            }
            if trailing {
                path.push('/');
            }

            let dir = dirname(&path);
            let base = basename(&path);
            let rebuilt = Path::new(&dir).join(base);

            prop_assert_eq!(
                normal_components(&rebuilt),
                normal_components(Path::new(&path))
            );
        }

        /// basename never contains a separator unless the path is all separators.
        #[test]
        fn basename_has_no_separator(
            segments in prop::collection::vec(segment(), 1..6),
        ) {
            let path = format!("/{}", segments.join("/"));
            prop_assert!(!basename(&path).as_bytes().contains(&b'/'));
            prop_assert_eq!(basename(&path), OsStr::new(segments.last().unwrap()));
        }
    }
}
