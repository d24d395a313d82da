//! Package comment record
//!
//! Wire format: `u32 comment_length`, `comment_length` bytes of UTF-8 text
//! ending in a single NUL, then 3 reserved zero bytes. An empty comment has
//! length 0 and no text bytes.

use crate::codec;
use crate::error::{EntryError, FieldContext, Result};
use std::io::{Read, Write};

/// Largest `comment_length`, terminator included
pub const MAX_COMMENT_LENGTH: u32 = 1_048_575;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageComment {
    pub comment_length: u32,
    /// Raw text bytes including the NUL terminator
    pub data: Vec<u8>,
    pub reserved: [u8; 3],
}

impl PackageComment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a comment from text; see [`PackageComment::set_comment`].
    pub fn from_text(text: &str) -> Result<Self> {
        let mut comment = Self::new();
        comment.set_comment(text)?;
        Ok(comment)
    }

    /// Replace the text. A trailing NUL is accepted and not doubled; any
    /// other NUL is rejected.
    pub fn set_comment(&mut self, text: &str) -> Result<()> {
        let body = text.strip_suffix('\0').unwrap_or(text);
        if let Some(pos) = body.bytes().position(|b| b == 0) {
            return Err(embedded_nul(pos));
        }
        let length = u32::try_from(body.len() + 1).unwrap_or(u32::MAX);
        if length > MAX_COMMENT_LENGTH {
            return Err(too_long(length));
        }

        let mut data = Vec::with_capacity(body.len() + 1);
        data.extend_from_slice(body.as_bytes());
        data.push(0);
        self.data = data;
        self.comment_length = length;
        self.reserved = [0; 3];
        Ok(())
    }

    /// Text without the terminator
    pub fn comment(&self) -> String {
        let body = self.data.strip_suffix(&[0]).unwrap_or(&self.data[..]);
        String::from_utf8_lossy(body).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.comment_length == 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Encoded size in bytes
    pub fn size(&self) -> usize {
        4 + self.comment_length as usize + 3
    }

    pub fn validate(&self) -> Result<()> {
        if self.comment_length == 0 {
            if !self.data.is_empty() {
                return Err(EntryError::validation(
                    "comment length mismatch",
                    FieldContext::new("comment_length", 0, "non-zero when comment present"),
                ));
            }
            return self.validate_reserved();
        }
        if self.comment_length > MAX_COMMENT_LENGTH {
            return Err(too_long(self.comment_length));
        }
        if self.data.is_empty() {
            return Err(EntryError::validation(
                "comment is empty but comment length is non-zero",
                FieldContext::new("comment", "\"\"", "non-empty comment"),
            ));
        }
        if let Err(e) = std::str::from_utf8(&self.data) {
            return Err(EntryError::validation(
                "comment is not valid UTF-8",
                FieldContext::new("comment", e.valid_up_to(), "valid UTF-8 string"),
            ));
        }
        let Some((&last, body)) = self.data.split_last() else {
            return Ok(());
        };
        if last != 0 {
            return Err(EntryError::validation(
                "comment is not null-terminated",
                FieldContext::new("comment", self.comment(), "null-terminated string"),
            ));
        }
        if let Some(pos) = body.iter().position(|&b| b == 0) {
            return Err(embedded_nul(pos));
        }
        if self.data.len() != self.comment_length as usize {
            return Err(EntryError::validation(
                "comment length mismatch",
                FieldContext::new("comment_length", self.comment_length, self.data.len().to_string()),
            ));
        }
        self.validate_reserved()
    }

    fn validate_reserved(&self) -> Result<()> {
        match self.reserved.iter().position(|&b| b != 0) {
            Some(i) => Err(EntryError::validation(
                format!("reserved byte {} must be zero", i),
                FieldContext::new("reserved", self.reserved[i], "0"),
            )),
            None => Ok(()),
        }
    }

    /// Validate, then write.
    pub fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<u64> {
        self.validate()?;
        codec::write_bytes(writer, &self.comment_length.to_le_bytes(), "comment_length")?;
        codec::write_bytes(writer, &self.data, "comment")?;
        codec::write_bytes(writer, &self.reserved, "reserved")?;
        Ok(self.size() as u64)
    }

    /// Read one comment record. Content rules are left to
    /// [`PackageComment::validate`]; only the length bound is enforced.
    pub fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let comment_length = codec::read_u32(reader, "comment_length")?;
        if comment_length > MAX_COMMENT_LENGTH {
            return Err(EntryError::corruption(
                "comment length exceeds maximum",
                FieldContext::new("comment_length", comment_length, format!("<= {}", MAX_COMMENT_LENGTH)),
            ));
        }
        let data = codec::read_length_prefixed(reader, comment_length as usize, "comment")?;
        let mut reserved = [0u8; 3];
        codec::read_full(reader, &mut reserved, "reserved")?;
        Ok(PackageComment {
            comment_length,
            data,
            reserved,
        })
    }
}

fn embedded_nul(pos: usize) -> EntryError {
    EntryError::validation(
        format!("comment contains embedded null character at position {}", pos),
        FieldContext::new("comment", pos, "no embedded null characters"),
    )
}

fn too_long(length: u32) -> EntryError {
    EntryError::validation(
        "comment length exceeds maximum",
        FieldContext::new("comment_length", length, format!("<= {}", MAX_COMMENT_LENGTH)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_set_comment_terminates() {
        let comment = PackageComment::from_text("hello").unwrap();
        assert_eq!(comment.comment_length, 6);
        assert_eq!(comment.data, b"hello\0".to_vec());
        assert_eq!(comment.comment(), "hello");
        assert_eq!(comment.size(), 13);
        assert!(comment.validate().is_ok());

        let again = PackageComment::from_text("hello\0").unwrap();
        assert_eq!(again, comment);
    }

    #[test]
    fn test_set_comment_rejects_embedded_nul() {
        let err = PackageComment::from_text("a\0b").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.context().value, "1");
    }

    #[test]
    fn test_set_comment_rejects_oversize() {
        let text = "x".repeat(MAX_COMMENT_LENGTH as usize);
        assert!(PackageComment::from_text(&text).is_err());
        let text = "x".repeat(MAX_COMMENT_LENGTH as usize - 1);
        assert!(PackageComment::from_text(&text).is_ok());
    }

    #[test]
    fn test_empty_and_clear() {
        let mut comment = PackageComment::from_text("").unwrap();
        assert_eq!(comment.comment_length, 1);
        assert!(!comment.is_empty());
        comment.clear();
        assert!(comment.is_empty());
        assert_eq!(comment.size(), 7);
        assert!(comment.validate().is_ok());
    }

    #[test]
    fn test_validate_failures() {
        let mut comment = PackageComment::from_text("abc").unwrap();
        comment.reserved[2] = 1;
        assert_eq!(comment.validate().unwrap_err().message(), "reserved byte 2 must be zero");

        let mut comment = PackageComment::from_text("abc").unwrap();
        comment.data.pop();
        comment.data.push(b'!');
        assert_eq!(comment.validate().unwrap_err().message(), "comment is not null-terminated");

        let mut comment = PackageComment::from_text("abc").unwrap();
        comment.comment_length = 9;
        assert_eq!(comment.validate().unwrap_err().message(), "comment length mismatch");

        let comment = PackageComment {
            comment_length: 3,
            data: vec![0xff, 0xfe, 0],
            reserved: [0; 3],
        };
        assert_eq!(comment.validate().unwrap_err().message(), "comment is not valid UTF-8");
    }

    #[test]
    fn test_round_trip() {
        let comment = PackageComment::from_text("Release build 42").unwrap();
        let mut bytes = Vec::new();
        let written = comment.encode(&mut bytes).unwrap();
        assert_eq!(written as usize, bytes.len());
        assert_eq!(&bytes[..4], &17u32.to_le_bytes());

        let decoded = PackageComment::decode(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(decoded, comment);
    }

    #[test]
    fn test_decode_truncated() {
        let comment = PackageComment::from_text("abc").unwrap();
        let mut bytes = Vec::new();
        comment.encode(&mut bytes).unwrap();
        let err = PackageComment::decode(&mut Cursor::new(&bytes[..6])).unwrap_err();
        assert!(err.is_corruption());

        let huge = (MAX_COMMENT_LENGTH + 1).to_le_bytes();
        assert!(PackageComment::decode(&mut Cursor::new(huge)).unwrap_err().is_corruption());
    }
}
