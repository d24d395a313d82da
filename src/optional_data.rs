//! Typed auxiliary-data records
//!
//! Wire format: `u8 type, u16 length, [length] bytes`. Only the tags slot
//! (type 0x00) is interpreted by this crate; every other type is carried
//! through untouched.

use crate::codec;
use crate::error::{EntryError, FieldContext, Result};
use std::io::{Read, Write};

/// Data type id of the slot holding the JSON-encoded tag array
pub const TAGS_DATA_TYPE: u8 = 0x00;

/// Known optional-data type identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OptionalDataType {
    Tags = 0x00,
    PathEncoding = 0x01,
    PathFlags = 0x02,
    CompressionDictionary = 0x03,
    SolidGroupId = 0x04,
    FileSystemFlags = 0x05,
    WindowsAttributes = 0x06,
    ExtendedAttributes = 0x07,
    Acl = 0x08,
}

impl OptionalDataType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(OptionalDataType::Tags),
            0x01 => Some(OptionalDataType::PathEncoding),
            0x02 => Some(OptionalDataType::PathFlags),
            0x03 => Some(OptionalDataType::CompressionDictionary),
            0x04 => Some(OptionalDataType::SolidGroupId),
            0x05 => Some(OptionalDataType::FileSystemFlags),
            0x06 => Some(OptionalDataType::WindowsAttributes),
            0x07 => Some(OptionalDataType::ExtendedAttributes),
            0x08 => Some(OptionalDataType::Acl),
            _ => None,
        }
    }
}

/// One optional-data record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionalDataEntry {
    pub data_type: u8,
    pub length: u16,
    pub data: Vec<u8>,
}

impl OptionalDataEntry {
    pub fn new(data_type: u8, data: Vec<u8>) -> Self {
        OptionalDataEntry {
            data_type,
            length: u16::try_from(data.len()).unwrap_or(u16::MAX),
            data,
        }
    }

    pub fn known_type(&self) -> Option<OptionalDataType> {
        OptionalDataType::from_u8(self.data_type)
    }

    pub fn is_tags(&self) -> bool {
        self.data_type == TAGS_DATA_TYPE
    }

    /// Replace the payload, keeping the length field in sync.
    pub fn set_data(&mut self, data: Vec<u8>) -> Result<()> {
        let length = u16::try_from(data.len()).map_err(|_| {
            EntryError::validation(
                "optional data too large",
                FieldContext::new("optional_data", data.len(), format!("at most {} bytes", u16::MAX)),
            )
        })?;
        self.length = length;
        self.data = data;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        codec::validate_len(&self.data, usize::from(self.length), "optional_data")
    }

    /// Encoded size in bytes
    pub fn size(&self) -> usize {
        3 + usize::from(self.length)
    }

    pub fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<u64> {
        if self.data.len() != usize::from(self.length) {
            return Err(EntryError::validation(
                "optional data length mismatch",
                FieldContext::new(
                    "optional_data_length",
                    self.length,
                    format!("{} bytes", self.data.len()),
                ),
            ));
        }
        let mut head = [0u8; 3];
        head[0] = self.data_type;
        head[1..3].copy_from_slice(&self.length.to_le_bytes());
        codec::write_bytes(writer, &head, "optional_data_header")?;
        codec::write_length_prefixed(writer, &self.data, usize::from(self.length), "optional_data")?;
        Ok(self.size() as u64)
    }

    pub fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        Self::decode_next(reader)?
            .ok_or_else(|| codec::short_read("optional_data_type", 0, 1))
    }

    /// Decode the next record, or `None` when the input ends cleanly before
    /// its first byte.
    pub fn decode_next<R: Read + ?Sized>(reader: &mut R) -> Result<Option<Self>> {
        let mut first = [0u8; 1];
        if codec::fill(reader, &mut first, "optional_data_type")? == 0 {
            return Ok(None);
        }
        let length = codec::read_u16(reader, "optional_data_length")?;
        let data = codec::read_length_prefixed(reader, usize::from(length), "optional_data")?;
        Ok(Some(OptionalDataEntry {
            data_type: first[0],
            length,
            data,
        }))
    }
}
