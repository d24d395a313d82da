//! Path records
//!
//! Wire format: `u16 length` followed by `length` UTF-8 bytes, not
//! null-terminated. Symlink annotations are runtime-only.

use crate::codec;
use crate::error::{EntryError, FieldContext, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// A single stored path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    /// Declared byte length of `path`
    pub length: u16,

    /// UTF-8 path, package-root relative with an optional leading '/'
    pub path: String,

    #[serde(skip)]
    pub is_symlink: bool,

    #[serde(skip)]
    pub link_target: String,
}

impl PathEntry {
    /// Create an entry whose length field matches `path`.
    ///
    /// Paths longer than `u16::MAX` bytes get a saturated length and fail
    /// [`PathEntry::validate`].
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        PathEntry {
            length: saturating_len(&path),
            path,
            is_symlink: false,
            link_target: String::new(),
        }
    }

    /// Mark this path as a symlink pointing at `target`.
    pub fn with_link_target(mut self, target: impl Into<String>) -> Self {
        self.is_symlink = true;
        self.link_target = target.into();
        self
    }

    /// Replace the path, keeping the length field in sync
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
        self.length = saturating_len(&self.path);
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(EntryError::validation(
                "path cannot be empty",
                FieldContext::new("path", format!("{:?}", self.path), "non-empty path"),
            ));
        }
        if usize::from(self.length) != self.path.len() {
            return Err(EntryError::validation(
                "path length mismatch",
                FieldContext::new(
                    "path_length",
                    self.length,
                    format!("{} (actual path length)", self.path.len()),
                ),
            ));
        }
        Ok(())
    }

    /// Encoded size in bytes
    pub fn size(&self) -> usize {
        2 + usize::from(self.length)
    }

    /// Path for display: one leading '/' removed, '\' separators on Windows
    pub fn display_path(&self, is_windows: bool) -> String {
        display_path(&self.path, is_windows)
    }

    /// [`PathEntry::display_path`] for the platform this build targets
    pub fn path_for_platform(&self) -> String {
        self.display_path(cfg!(windows))
    }

    pub fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<u64> {
        if usize::from(self.length) != self.path.len() {
            return Err(EntryError::validation(
                "path length mismatch",
                FieldContext::new("path_length", self.length, format!("{} bytes", self.path.len())),
            ));
        }
        codec::write_bytes(writer, &self.length.to_le_bytes(), "path_length")?;
        codec::write_length_prefixed(writer, self.path.as_bytes(), usize::from(self.length), "path")?;
        Ok(self.size() as u64)
    }

    pub fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let length = codec::read_u16(reader, "path_length")?;
        let bytes = codec::read_length_prefixed(reader, usize::from(length), "path")?;
        let path = String::from_utf8(bytes).map_err(|e| {
            EntryError::corruption(
                "path is not valid UTF-8",
                FieldContext::new("path", e.utf8_error(), "UTF-8 path bytes"),
            )
        })?;
        Ok(PathEntry {
            length,
            path,
            is_symlink: false,
            link_target: String::new(),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.size());
        self.encode(&mut bytes)?;
        Ok(bytes)
    }
}

fn saturating_len(path: &str) -> u16 {
    u16::try_from(path.len()).unwrap_or(u16::MAX)
}

pub(crate) fn display_path(path: &str, is_windows: bool) -> String {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if is_windows {
        trimmed.replace('/', "\\")
    } else {
        trimmed.to_string()
    }
}

/// Lexically normalize a '/'-separated path: collapse repeated separators,
/// drop "." segments and resolve ".." against preceding segments.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => String::from("."),
        (false, false) => joined,
    }
}

/// Directory part of a path, cleaned; "." when there is none
pub fn parent_dir(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => String::from("/"),
        Some(idx) => clean_path(&path[..idx]),
        None => String::from("."),
    }
}

/// Resolve a symlink `target` relative to the directory holding `path`.
///
/// Absolute targets are returned unchanged.
pub fn resolve_link(path: &str, target: &str) -> String {
    if target.starts_with('/') {
        return target.to_string();
    }
    clean_path(&format!("{}/{}", parent_dir(path), target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Cursor;

    #[test]
    fn test_new_sets_length() {
        let entry = PathEntry::new("/docs/readme.md");
        assert_eq!(entry.length, 15);
        assert_eq!(entry.size(), 17);
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn test_validate_blank_path() {
        let entry = PathEntry::new("   ");
        assert!(entry.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_validate_length_mismatch() {
        let mut entry = PathEntry::new("a.txt");
        entry.length = 9;
        let err = entry.validate().unwrap_err();
        assert_eq!(err.context().field, "path_length");
    }

    #[test]
    fn test_oversized_path_fails_validation() {
        let entry = PathEntry::new("x".repeat(70_000));
        assert_eq!(entry.length, u16::MAX);
        assert!(entry.validate().is_err());
    }

    #[test]
    fn test_wire_layout() {
        let bytes = PathEntry::new("a/b").to_bytes().unwrap();
        assert_eq!(bytes, vec![3, 0, b'a', b'/', b'b']);
    }

    #[test]
    fn test_decode_round_trip() {
        let entry = PathEntry::new("/dir/файл.txt");
        let bytes = entry.to_bytes().unwrap();
        let decoded = PathEntry::decode(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_decode_truncated() {
        let err = PathEntry::decode(&mut Cursor::new(vec![5, 0, b'a'])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let err = PathEntry::decode(&mut Cursor::new(vec![2, 0, 0xff, 0xfe])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);
    }

    #[test]
    fn test_encode_rejects_length_mismatch() {
        let mut entry = PathEntry::new("abc");
        entry.length = 2;
        let mut out = Vec::new();
        assert!(entry.encode(&mut out).unwrap_err().is_validation());
    }

    #[test]
    fn test_display_path() {
        let entry = PathEntry::new("/dir/sub/file.txt");
        assert_eq!(entry.display_path(false), "dir/sub/file.txt");
        assert_eq!(entry.display_path(true), "dir\\sub\\file.txt");
        assert_eq!(PathEntry::new("//x").display_path(false), "/x");
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("/a//b/./c/../d"), "/a/b/d");
        assert_eq!(clean_path("a/../../b"), "../b");
        assert_eq!(clean_path("/../x"), "/x");
        assert_eq!(clean_path(""), ".");
        assert_eq!(clean_path("/"), "/");
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("/docs/a.txt"), "/docs");
        assert_eq!(parent_dir("/a.txt"), "/");
        assert_eq!(parent_dir("a.txt"), ".");
    }

    #[test]
    fn test_resolve_link() {
        assert_eq!(resolve_link("/docs/latest", "v2/readme.md"), "/docs/v2/readme.md");
        assert_eq!(resolve_link("/docs/latest", "../shared/x"), "/shared/x");
        assert_eq!(resolve_link("/docs/latest", "/abs/target"), "/abs/target");
        assert_eq!(resolve_link("link", "target"), "target");
    }

    #[test]
    fn test_set_path_updates_length() {
        let mut entry = PathEntry::new("a");
        entry.set_path("longer/name");
        assert_eq!(entry.length, 11);
    }
}
