//! Typed hash records
//!
//! Wire format: `u8 type, u8 purpose, u16 length, [length] bytes`. Type and
//! purpose stay raw bytes so unknown identifiers survive a round trip.

use crate::codec;
use crate::error::{EntryError, FieldContext, Result};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};

/// Hash algorithm identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HashAlgorithm {
    Sha256 = 0x00,
    Sha512 = 0x01,
    Blake3 = 0x02,
    Xxh3 = 0x03,
    Blake2b = 0x04,
    Blake2s = 0x05,
    Sha3_256 = 0x06,
    Sha3_512 = 0x07,
    Crc32 = 0x08,
    Crc64 = 0x09,
}

impl HashAlgorithm {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(HashAlgorithm::Sha256),
            0x01 => Some(HashAlgorithm::Sha512),
            0x02 => Some(HashAlgorithm::Blake3),
            0x03 => Some(HashAlgorithm::Xxh3),
            0x04 => Some(HashAlgorithm::Blake2b),
            0x05 => Some(HashAlgorithm::Blake2s),
            0x06 => Some(HashAlgorithm::Sha3_256),
            0x07 => Some(HashAlgorithm::Sha3_512),
            0x08 => Some(HashAlgorithm::Crc32),
            0x09 => Some(HashAlgorithm::Crc64),
            _ => None,
        }
    }

    /// Digest length in bytes
    pub fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 | HashAlgorithm::Blake3 | HashAlgorithm::Sha3_256 => 32,
            HashAlgorithm::Blake2s => 32,
            HashAlgorithm::Sha512 | HashAlgorithm::Blake2b | HashAlgorithm::Sha3_512 => 64,
            HashAlgorithm::Xxh3 | HashAlgorithm::Crc64 => 8,
            HashAlgorithm::Crc32 => 4,
        }
    }
}

/// What a stored hash is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HashPurpose {
    ContentVerification = 0x00,
    Deduplication = 0x01,
    Integrity = 0x02,
    FastLookup = 0x03,
    ErrorDetection = 0x04,
}

impl HashPurpose {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(HashPurpose::ContentVerification),
            0x01 => Some(HashPurpose::Deduplication),
            0x02 => Some(HashPurpose::Integrity),
            0x03 => Some(HashPurpose::FastLookup),
            0x04 => Some(HashPurpose::ErrorDetection),
            _ => None,
        }
    }
}

/// A single hash attached to a file entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashEntry {
    pub hash_type: u8,
    pub hash_purpose: u8,
    pub length: u16,
    pub data: Vec<u8>,
}

impl HashEntry {
    pub fn new(hash_type: u8, hash_purpose: u8, data: Vec<u8>) -> Self {
        HashEntry {
            hash_type,
            hash_purpose,
            length: u16::try_from(data.len()).unwrap_or(u16::MAX),
            data,
        }
    }

    /// SHA-256 of `content`
    pub fn sha256(content: &[u8], purpose: HashPurpose) -> Self {
        let digest = Sha256::digest(content);
        Self::new(HashAlgorithm::Sha256 as u8, purpose as u8, digest.to_vec())
    }

    pub fn algorithm(&self) -> Option<HashAlgorithm> {
        HashAlgorithm::from_u8(self.hash_type)
    }

    pub fn purpose(&self) -> Option<HashPurpose> {
        HashPurpose::from_u8(self.hash_purpose)
    }

    pub fn validate(&self) -> Result<()> {
        codec::validate_len(&self.data, usize::from(self.length), "hash_data")
    }

    /// Encoded size in bytes
    pub fn size(&self) -> usize {
        4 + usize::from(self.length)
    }

    pub fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<u64> {
        if self.data.len() != usize::from(self.length) {
            return Err(EntryError::validation(
                "hash length mismatch",
                FieldContext::new("hash_length", self.length, format!("{} bytes", self.data.len())),
            ));
        }
        let mut head = [0u8; 4];
        head[0] = self.hash_type;
        head[1] = self.hash_purpose;
        head[2..4].copy_from_slice(&self.length.to_le_bytes());
        codec::write_bytes(writer, &head, "hash_header")?;
        codec::write_length_prefixed(writer, &self.data, usize::from(self.length), "hash_data")?;
        Ok(self.size() as u64)
    }

    pub fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let hash_type = codec::read_u8(reader, "hash_type")?;
        let hash_purpose = codec::read_u8(reader, "hash_purpose")?;
        let length = codec::read_u16(reader, "hash_length")?;
        let data = codec::read_length_prefixed(reader, usize::from(length), "hash_data")?;
        Ok(HashEntry {
            hash_type,
            hash_purpose,
            length,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Cursor;

    #[test]
    fn test_sha256_helper() {
        let entry = HashEntry::sha256(b"abc", HashPurpose::ContentVerification);
        assert_eq!(entry.length, 32);
        assert_eq!(entry.algorithm(), Some(HashAlgorithm::Sha256));
        assert_eq!(entry.data[..4], [0xba, 0x78, 0x16, 0xbf]);
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn test_validate_rules() {
        let empty = HashEntry::new(0, 0, Vec::new());
        assert!(empty.validate().unwrap_err().is_validation());

        let mut mismatched = HashEntry::new(0, 0, vec![1, 2, 3]);
        mismatched.length = 4;
        assert!(mismatched.validate().is_err());
    }

    #[test]
    fn test_unknown_ids_round_trip() {
        let entry = HashEntry::new(0xee, 0x7f, vec![9; 8]);
        assert_eq!(entry.algorithm(), None);
        assert_eq!(entry.purpose(), None);

        let mut bytes = Vec::new();
        entry.encode(&mut bytes).unwrap();
        assert_eq!(bytes.len(), entry.size());
        assert_eq!(&bytes[..4], &[0xee, 0x7f, 8, 0]);

        let decoded = HashEntry::decode(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_decode_truncated_data() {
        let err = HashEntry::decode(&mut Cursor::new(vec![0, 0, 32, 0, 1, 2])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);
    }

    #[test]
    fn test_digest_len() {
        assert_eq!(HashAlgorithm::Sha512.digest_len(), 64);
        assert_eq!(HashAlgorithm::Crc32.digest_len(), 4);
    }
}
