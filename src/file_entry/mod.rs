//! File entry records
//!
//! A file entry is a fixed 64-byte header followed by three variable
//! sections: path entries, hash entries and optional-data entries. Content
//! bytes are never part of the entry; they are staged separately and
//! written by [`FileEntry::write_content`].
//!
//! ```text
//! Offset  Size  Field
//! 0       8     file_id
//! 8       8     original_size
//! 16      8     stored_size
//! 24      4     raw_checksum (CRC32)
//! 28      4     stored_checksum (CRC32)
//! 32      4     file_version
//! 36      4     metadata_version
//! 40      2     path_count
//! 42      2     file_type
//! 44      1     compression_type
//! 45      1     compression_level
//! 46      1     encryption_type
//! 47      1     hash_count
//! 48      4     hash_data_offset
//! 52      2     hash_data_len
//! 54      2     optional_data_len
//! 56      4     optional_data_offset
//! 60      4     reserved (must be 0)
//! ```

mod codec;
mod content;
mod paths;

pub use content::{CancelToken, SourceFile};

use crate::codec::FieldReader;
use crate::error::{EntryError, FieldContext, Result};
use crate::hash_entry::HashEntry;
use crate::optional_data::OptionalDataEntry;
use crate::path_entry::PathEntry;
use crate::processing::{PendingWork, ProcessingState, StageStatus};

/// Size of the fixed header in bytes
pub const FILE_ENTRY_FIXED_SIZE: usize = 64;

/// Fixed section of a file entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileEntryHeader {
    pub file_id: u64,
    pub original_size: u64,
    pub stored_size: u64,
    pub raw_checksum: u32,
    pub stored_checksum: u32,
    pub file_version: u32,
    pub metadata_version: u32,
    pub path_count: u16,
    pub file_type: u16,
    pub compression_type: u8,
    pub compression_level: u8,
    pub encryption_type: u8,
    pub hash_count: u8,
    pub hash_data_offset: u32,
    pub hash_data_len: u16,
    pub optional_data_len: u16,
    pub optional_data_offset: u32,
    pub reserved: u32,
}

impl FileEntryHeader {
    pub fn to_bytes(&self) -> [u8; FILE_ENTRY_FIXED_SIZE] {
        let mut bytes = Vec::with_capacity(FILE_ENTRY_FIXED_SIZE);

        bytes.extend_from_slice(&self.file_id.to_le_bytes());
        bytes.extend_from_slice(&self.original_size.to_le_bytes());
        bytes.extend_from_slice(&self.stored_size.to_le_bytes());
        bytes.extend_from_slice(&self.raw_checksum.to_le_bytes());
        bytes.extend_from_slice(&self.stored_checksum.to_le_bytes());
        bytes.extend_from_slice(&self.file_version.to_le_bytes());
        bytes.extend_from_slice(&self.metadata_version.to_le_bytes());
        bytes.extend_from_slice(&self.path_count.to_le_bytes());
        bytes.extend_from_slice(&self.file_type.to_le_bytes());
        bytes.push(self.compression_type);
        bytes.push(self.compression_level);
        bytes.push(self.encryption_type);
        bytes.push(self.hash_count);
        bytes.extend_from_slice(&self.hash_data_offset.to_le_bytes());
        bytes.extend_from_slice(&self.hash_data_len.to_le_bytes());
        bytes.extend_from_slice(&self.optional_data_len.to_le_bytes());
        bytes.extend_from_slice(&self.optional_data_offset.to_le_bytes());
        bytes.extend_from_slice(&self.reserved.to_le_bytes());

        let mut out = [0u8; FILE_ENTRY_FIXED_SIZE];
        out.copy_from_slice(&bytes);
        out
    }

    /// Read the header verbatim; no field is checked here.
    pub fn from_bytes(bytes: &[u8; FILE_ENTRY_FIXED_SIZE]) -> Self {
        let mut r = FieldReader::new(bytes);
        FileEntryHeader {
            file_id: r.u64(),
            original_size: r.u64(),
            stored_size: r.u64(),
            raw_checksum: r.u32(),
            stored_checksum: r.u32(),
            file_version: r.u32(),
            metadata_version: r.u32(),
            path_count: r.u16(),
            file_type: r.u16(),
            compression_type: r.u8(),
            compression_level: r.u8(),
            encryption_type: r.u8(),
            hash_count: r.u8(),
            hash_data_offset: r.u32(),
            hash_data_len: r.u16(),
            optional_data_len: r.u16(),
            optional_data_offset: r.u32(),
            reserved: r.u32(),
        }
    }
}

/// A file record: header, variable sections and runtime content state
#[derive(Debug, Default)]
pub struct FileEntry {
    pub header: FileEntryHeader,
    pub paths: Vec<PathEntry>,
    pub hashes: Vec<HashEntry>,
    pub optional_data: Vec<OptionalDataEntry>,

    data: Option<Vec<u8>>,
    source: Option<SourceFile>,
    temp_path: Option<std::path::PathBuf>,
    processing_state: ProcessingState,
    stage_status: StageStatus,
}

impl FileEntry {
    pub fn new(file_id: u64) -> Self {
        FileEntry {
            header: FileEntryHeader {
                file_id,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn file_id(&self) -> u64 {
        self.header.file_id
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.add_path(PathEntry::new(path));
        self
    }

    pub fn with_hash(mut self, hash: HashEntry) -> Self {
        self.add_hash(hash);
        self
    }

    /// Append a path and bump `path_count`
    pub fn add_path(&mut self, path: PathEntry) {
        self.paths.push(path);
        self.header.path_count = self.header.path_count.saturating_add(1);
    }

    /// Append a hash and bump `hash_count`
    pub fn add_hash(&mut self, hash: HashEntry) {
        self.hashes.push(hash);
        self.header.hash_count = self.header.hash_count.saturating_add(1);
    }

    /// Append an optional-data record and grow `optional_data_len`
    pub fn add_optional_data(&mut self, entry: OptionalDataEntry) {
        let size = u16::try_from(entry.size()).unwrap_or(u16::MAX);
        self.header.optional_data_len = self.header.optional_data_len.saturating_add(size);
        self.optional_data.push(entry);
    }

    pub fn validate(&self) -> Result<()> {
        let header = &self.header;
        if header.file_id == 0 {
            return Err(EntryError::validation(
                "file ID cannot be zero",
                FieldContext::new("file_id", header.file_id, "non-zero value"),
            ));
        }
        if header.reserved != 0 {
            return Err(EntryError::validation(
                "reserved field must be zero",
                FieldContext::new("reserved", header.reserved, "0"),
            ));
        }
        if usize::from(header.path_count) != self.paths.len() {
            return Err(EntryError::validation(
                "path count mismatch",
                FieldContext::new("path_count", header.path_count, self.paths.len().to_string()),
            ));
        }
        if usize::from(header.hash_count) != self.hashes.len() {
            return Err(EntryError::validation(
                "hash count mismatch",
                FieldContext::new("hash_count", header.hash_count, self.hashes.len().to_string()),
            ));
        }
        for (i, path) in self.paths.iter().enumerate() {
            path.validate().map_err(|e| {
                e.wrap(
                    format!("invalid path at index {}", i),
                    FieldContext::new("paths", i, "valid path entry"),
                )
            })?;
        }
        for (i, hash) in self.hashes.iter().enumerate() {
            hash.validate().map_err(|e| {
                e.wrap(
                    format!("invalid hash at index {}", i),
                    FieldContext::new("hashes", i, "valid hash entry"),
                )
            })?;
        }
        for (i, opt) in self.optional_data.iter().enumerate() {
            opt.validate().map_err(|e| {
                e.wrap(
                    format!("invalid optional data at index {}", i),
                    FieldContext::new("optional_data", i, "valid optional data entry"),
                )
            })?;
        }
        Ok(())
    }

    pub fn fixed_size(&self) -> usize {
        FILE_ENTRY_FIXED_SIZE
    }

    pub fn paths_size(&self) -> usize {
        self.paths.iter().map(PathEntry::size).sum()
    }

    pub fn hashes_size(&self) -> usize {
        self.hashes.iter().map(HashEntry::size).sum()
    }

    pub fn optional_data_size(&self) -> usize {
        self.optional_data.iter().map(OptionalDataEntry::size).sum()
    }

    pub fn variable_size(&self) -> usize {
        self.paths_size() + self.hashes_size() + self.optional_data_size()
    }

    pub fn total_size(&self) -> usize {
        self.fixed_size() + self.variable_size()
    }

    /// Recompute counts, section offsets and section lengths from the
    /// current slices.
    pub fn refresh_layout(&mut self) -> Result<()> {
        let path_count = u16::try_from(self.paths.len())
            .map_err(|_| too_many("path_count", self.paths.len(), u16::MAX as usize))?;
        let hash_count = u8::try_from(self.hashes.len())
            .map_err(|_| too_many("hash_count", self.hashes.len(), u8::MAX as usize))?;

        let paths_size = self.paths_size();
        let hashes_size = self.hashes_size();
        let optional_size = self.optional_data_size();

        let hash_data_len = u16::try_from(hashes_size)
            .map_err(|_| too_many("hash_data_len", hashes_size, u16::MAX as usize))?;
        let optional_data_len = u16::try_from(optional_size)
            .map_err(|_| too_many("optional_data_len", optional_size, u16::MAX as usize))?;
        let hash_data_offset = u32::try_from(paths_size)
            .map_err(|_| too_many("hash_data_offset", paths_size, u32::MAX as usize))?;
        let optional_data_offset = u32::try_from(paths_size + hashes_size).map_err(|_| {
            too_many("optional_data_offset", paths_size + hashes_size, u32::MAX as usize)
        })?;

        let header = &mut self.header;
        header.path_count = path_count;
        header.hash_count = hash_count;
        header.hash_data_offset = hash_data_offset;
        header.hash_data_len = hash_data_len;
        header.optional_data_offset = optional_data_offset;
        header.optional_data_len = optional_data_len;
        Ok(())
    }

    /// Recompute only `optional_data_len`, saturating at `u16::MAX`.
    ///
    /// Overflow is reported by [`FileEntry::refresh_layout`] when the entry
    /// is written.
    pub(crate) fn refresh_optional_data_len(&mut self) {
        let size = self.optional_data_size();
        self.header.optional_data_len = u16::try_from(size).unwrap_or(u16::MAX);
    }

    pub fn processing_state(&self) -> ProcessingState {
        self.processing_state
    }

    pub fn set_processing_state(&mut self, state: ProcessingState) {
        self.processing_state = state;
    }

    /// Record that the staged bytes were compressed
    pub fn mark_compressed(&mut self) -> Result<()> {
        self.processing_state = self.processing_state.compressed()?;
        Ok(())
    }

    /// Record that the staged bytes were encrypted
    pub fn mark_encrypted(&mut self) -> Result<()> {
        self.processing_state = self.processing_state.encrypted()?;
        Ok(())
    }

    /// Compression/encryption still owed before the content can be committed
    pub fn pending_processing(&self) -> PendingWork {
        self.processing_state
            .pending(self.header.compression_type, self.header.encryption_type)
    }

    pub fn stage_status(&self) -> StageStatus {
        self.stage_status
    }

    /// Record size and CRC32 of the unprocessed content
    pub fn stamp_raw_content(&mut self, content: &[u8]) {
        self.header.original_size = content.len() as u64;
        self.header.raw_checksum = crc32fast::hash(content);
    }

    /// Record size and CRC32 of the content as it will be stored
    pub fn stamp_stored_content(&mut self, content: &[u8]) {
        self.header.stored_size = content.len() as u64;
        self.header.stored_checksum = crc32fast::hash(content);
    }

    pub fn verify_raw_checksum(&self, content: &[u8]) -> Result<()> {
        let actual = crc32fast::hash(content);
        if actual != self.header.raw_checksum || content.len() as u64 != self.header.original_size {
            return Err(EntryError::corruption(
                "raw content checksum mismatch",
                FieldContext::new(
                    "raw_checksum",
                    format!("{:#010x}", actual),
                    format!("{:#010x}", self.header.raw_checksum),
                ),
            ));
        }
        Ok(())
    }
}

fn too_many(field: &str, actual: usize, max: usize) -> EntryError {
    EntryError::validation(
        format!("{} exceeds the format limit", field),
        FieldContext::new(field, actual, format!("at most {}", max)),
    )
}
