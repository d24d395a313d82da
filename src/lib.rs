//! # NovusPack entries
//!
//! `novuspack-entry` reads and writes the per-file records of a NovusPack
//! package and manages the metadata attached to them:
//!
//! - **Entry codecs**: path, hash and optional-data records and the file
//!   entry that groups them behind a fixed 64-byte header
//! - **Tags**: typed key/value tags stored as JSON in a file entry's
//!   optional data, with recovery from partially corrupted tag data
//! - **Path metadata**: per-path records arranged in a directory tree with
//!   priority-based tag inheritance and file associations
//! - **Package comment**: the null-terminated comment record
//!
//! ## Quick Start
//!
//! ```rust
//! use novuspack_entry::{FileEntry, HashEntry, HashPurpose, Result};
//! use std::io::Cursor;
//!
//! # fn main() -> Result<()> {
//! let mut entry = FileEntry::new(1)
//!     .with_path("docs/readme.md")
//!     .with_hash(HashEntry::sha256(b"hello", HashPurpose::ContentVerification));
//! entry.add_tag("author", "Jane")?;
//!
//! let bytes = entry.to_metadata_bytes()?;
//! let mut decoded = FileEntry::decode(&mut Cursor::new(&bytes))?;
//! decoded.validate()?;
//! assert_eq!(decoded.tag_as::<String>("author")?.value, "Jane");
//! # Ok(())
//! # }
//! ```
//!
//! ## Path hierarchy
//!
//! ```rust
//! use novuspack_entry::{EntryGraph, FileEntry, PathMetadataEntry, Tag, Result};
//!
//! # fn main() -> Result<()> {
//! let mut graph = EntryGraph::new();
//! let docs = graph.add_path(
//!     PathMetadataEntry::directory("/docs")
//!         .with_inheritance(true, 1)
//!         .with_tag(Tag::new("team", "writers")),
//! );
//! let page = graph.add_path(PathMetadataEntry::file("/docs/a.md"));
//! graph.set_parent(page, Some(docs))?;
//!
//! let file = graph.add_file(FileEntry::new(7).with_path("/docs/a.md"));
//! graph.associate(page, file)?;
//!
//! let tags = graph.file_effective_tags(file)?;
//! assert!(tags.contains("team"));
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod comment;
pub mod config;
pub mod error;
pub mod file_entry;
pub mod graph;
pub mod hash_entry;
pub mod optional_data;
pub mod path_entry;
pub mod path_metadata;
pub mod processing;
pub mod refs;
pub mod tags;

pub use comment::{PackageComment, MAX_COMMENT_LENGTH};
pub use config::{DecodeOptions, EntryConfig, StagingConfig};
pub use error::{EntryError, ErrorKind, FieldContext, Result};
pub use file_entry::{CancelToken, FileEntry, FileEntryHeader, SourceFile, FILE_ENTRY_FIXED_SIZE};
pub use graph::{EntryGraph, FileId, PathId};
pub use hash_entry::{HashAlgorithm, HashEntry, HashPurpose};
pub use optional_data::{OptionalDataEntry, OptionalDataType, TAGS_DATA_TYPE};
pub use path_entry::PathEntry;
pub use path_metadata::{
    AclEntry, PathFileSystem, PathInheritance, PathMetadata, PathMetadataEntry, PathMetadataType,
};
pub use processing::{PendingWork, ProcessingState, StageStatus};
pub use refs::{FileEntryRef, PathMetadataEntryRef};
pub use tags::{FromTagValue, Tag, TagMap, TagRead, TagValue, TagValueType, TypedTag};
