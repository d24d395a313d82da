//! Streaming encode/decode of file entry metadata

use super::{FileEntry, FileEntryHeader, FILE_ENTRY_FIXED_SIZE};
use crate::codec;
use crate::config::DecodeOptions;
use crate::error::{EntryError, FieldContext, Result};
use crate::hash_entry::HashEntry;
use crate::optional_data::OptionalDataEntry;
use crate::path_entry::PathEntry;
use std::io::{Cursor, Read, Write};
use tracing::{debug, warn};

impl FileEntry {
    /// Decode one entry with default options.
    pub fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        Self::decode_with(reader, &DecodeOptions::default())
    }

    /// Decode one entry: header, paths, hashes, then optional data.
    ///
    /// Section offsets larger than the bytes consumed so far are honored by
    /// discarding the gap. Smaller offsets are ignored.
    pub fn decode_with<R: Read + ?Sized>(reader: &mut R, options: &DecodeOptions) -> Result<Self> {
        let mut raw = [0u8; FILE_ENTRY_FIXED_SIZE];
        let filled = codec::fill(reader, &mut raw, "file_entry_header")?;
        if filled != FILE_ENTRY_FIXED_SIZE {
            return Err(EntryError::corruption(
                "truncated file entry header",
                FieldContext::new("file_entry_header", filled, format!("{} bytes", FILE_ENTRY_FIXED_SIZE)),
            ));
        }
        let header = FileEntryHeader::from_bytes(&raw);
        let mut entry = FileEntry {
            header,
            ..Default::default()
        };

        let mut consumed = 0usize;
        for i in 0..usize::from(header.path_count) {
            let path = PathEntry::decode(reader).map_err(|e| {
                e.wrap(
                    format!("failed to read path entry {}", i),
                    FieldContext::new("paths", i, format!("{} path entries", header.path_count)),
                )
            })?;
            consumed += path.size();
            entry.paths.push(path);
        }

        consumed = skip_gap(reader, consumed, header.hash_data_offset, "hash_data_offset")?;
        for i in 0..usize::from(header.hash_count) {
            let hash = HashEntry::decode(reader).map_err(|e| {
                e.wrap(
                    format!("failed to read hash entry {}", i),
                    FieldContext::new("hashes", i, format!("{} hash entries", header.hash_count)),
                )
            })?;
            consumed += hash.size();
            entry.hashes.push(hash);
        }

        skip_gap(reader, consumed, header.optional_data_offset, "optional_data_offset")?;
        let limit = usize::from(header.optional_data_len);
        let mut read = 0usize;
        while read < limit {
            let next = OptionalDataEntry::decode_next(reader).map_err(|e| {
                e.wrap(
                    format!("failed to read optional data entry {}", entry.optional_data.len()),
                    FieldContext::new("optional_data", read, format!("{} bytes", limit)),
                )
            })?;
            match next {
                Some(opt) => {
                    read += opt.size();
                    entry.optional_data.push(opt);
                }
                None if !entry.optional_data.is_empty() && !options.strict_optional_eof => {
                    warn!(
                        file_id = header.file_id,
                        read,
                        declared = limit,
                        "optional data section ended early, keeping {} records",
                        entry.optional_data.len()
                    );
                    break;
                }
                None => {
                    return Err(EntryError::corruption(
                        "optional data section truncated",
                        FieldContext::new("optional_data_len", read, format!("{} bytes", limit)),
                    ));
                }
            }
        }

        debug!(
            file_id = header.file_id,
            paths = entry.paths.len(),
            hashes = entry.hashes.len(),
            optional = entry.optional_data.len(),
            "decoded file entry"
        );
        Ok(entry)
    }

    /// Decode from a byte slice, then bring the tags slot into a consistent
    /// state. Tag recovery problems are logged, not returned.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut entry = Self::decode(&mut Cursor::new(bytes))?;
        if let Err(e) = entry.sync_tags() {
            warn!(file_id = entry.file_id(), error = %e, "tag synchronization failed after decode");
        }
        Ok(entry)
    }

    /// Write header and variable sections.
    ///
    /// Counts, offsets and section lengths are recomputed first, so the
    /// header written always agrees with the sections that follow it.
    pub fn write_metadata<W: Write + ?Sized>(&mut self, writer: &mut W) -> Result<u64> {
        self.refresh_layout()?;

        codec::write_bytes(writer, &self.header.to_bytes(), "file_entry_header")?;
        let mut written = FILE_ENTRY_FIXED_SIZE as u64;

        for (i, path) in self.paths.iter().enumerate() {
            written += path.encode(writer).map_err(|e| {
                e.wrap(format!("failed to write path entry {}", i), FieldContext::new("paths", i, "written successfully"))
            })?;
        }
        for (i, hash) in self.hashes.iter().enumerate() {
            written += hash.encode(writer).map_err(|e| {
                e.wrap(format!("failed to write hash entry {}", i), FieldContext::new("hashes", i, "written successfully"))
            })?;
        }
        for (i, opt) in self.optional_data.iter().enumerate() {
            written += opt.encode(writer).map_err(|e| {
                e.wrap(
                    format!("failed to write optional data entry {}", i),
                    FieldContext::new("optional_data", i, "written successfully"),
                )
            })?;
        }

        debug!(file_id = self.header.file_id, bytes = written, "wrote file entry metadata");
        Ok(written)
    }

    /// Alias of [`FileEntry::write_metadata`]
    pub fn encode<W: Write + ?Sized>(&mut self, writer: &mut W) -> Result<u64> {
        self.write_metadata(writer)
    }

    pub fn to_metadata_bytes(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.total_size());
        self.write_metadata(&mut bytes)?;
        Ok(bytes)
    }

    /// Write metadata followed by content.
    pub fn write_all<W: Write + ?Sized>(&mut self, writer: &mut W) -> Result<u64> {
        let meta = self.write_metadata(writer)?;
        let content = self.write_content(writer)?;
        Ok(meta + content)
    }
}

fn skip_gap<R: Read + ?Sized>(reader: &mut R, consumed: usize, offset: u32, field: &str) -> Result<usize> {
    let target = offset as usize;
    if target <= consumed {
        return Ok(consumed);
    }
    let gap = target - consumed;
    warn!(field, gap, "skipping unread bytes before section");
    codec::skip(reader, gap as u64, field).map_err(|e| {
        e.wrap(
            format!("cannot reach {}", field),
            FieldContext::new(field, offset, format!("offset within input ({} bytes consumed)", consumed)),
        )
    })?;
    Ok(target)
}
