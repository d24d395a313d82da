//! Path metadata records
//!
//! A [`PathMetadataEntry`] describes one path in a package: its kind,
//! direct tags, inheritance settings for directories and filesystem
//! attributes. Tree links and file associations live in
//! [`crate::graph::EntryGraph`].

mod tags;

use crate::error::{EntryError, FieldContext, Result};
use crate::path_entry::{self, PathEntry};
use crate::tags::Tag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a path refers to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum PathMetadataType {
    #[default]
    File = 0,
    Directory = 1,
    FileSymlink = 2,
    DirectorySymlink = 3,
}

impl PathMetadataType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PathMetadataType::File),
            1 => Some(PathMetadataType::Directory),
            2 => Some(PathMetadataType::FileSymlink),
            3 => Some(PathMetadataType::DirectorySymlink),
            _ => None,
        }
    }

    /// Plain file or file symlink
    pub fn is_file_like(self) -> bool {
        matches!(self, PathMetadataType::File | PathMetadataType::FileSymlink)
    }
}

impl TryFrom<u8> for PathMetadataType {
    type Error = EntryError;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_u8(value).ok_or_else(|| {
            EntryError::validation(
                "invalid path metadata type",
                FieldContext::new("type", value, "0-3 (file, directory, file symlink, directory symlink)"),
            )
        })
    }
}

impl From<PathMetadataType> for u8 {
    fn from(kind: PathMetadataType) -> u8 {
        kind as u8
    }
}

/// Inheritance settings of a directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathInheritance {
    pub enabled: bool,
    /// Higher values win over lower ones
    pub priority: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathMetadata {
    /// ISO 8601
    pub created: String,
    /// ISO 8601
    pub modified: String,
    pub description: String,
}

/// One access control entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    /// "user", "group", "other" or "mask"
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    /// e.g. "rwx", "r--"
    pub perms: String,
}

/// Filesystem attributes recorded for a path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathFileSystem {
    pub is_executable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub acl: Vec<AclEntry>,
    /// Unix nanoseconds
    pub mod_time: u64,
    pub create_time: u64,
    pub access_time: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub link_target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows_attrs: Option<u32>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extended_attrs: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u16>,
}

/// Metadata for a single package path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathMetadataEntry {
    pub path: PathEntry,
    #[serde(rename = "type")]
    pub kind: PathMetadataType,
    #[serde(default)]
    pub properties: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inheritance: Option<PathInheritance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PathMetadata>,
    #[serde(default, rename = "filesystem")]
    pub filesystem: PathFileSystem,
}

impl PathMetadataEntry {
    pub fn new(path: impl Into<String>, kind: PathMetadataType) -> Self {
        PathMetadataEntry {
            path: PathEntry::new(path),
            kind,
            ..Default::default()
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self::new(path, PathMetadataType::File)
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self::new(path, PathMetadataType::Directory)
    }

    /// Enable inheritance with `priority`.
    pub fn with_inheritance(mut self, enabled: bool, priority: i32) -> Self {
        self.inheritance = Some(PathInheritance { enabled, priority });
        self
    }

    pub fn with_metadata(mut self, metadata: PathMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Append a direct tag without contract checks.
    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.properties.push(tag);
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.path.validate().map_err(|e| {
            e.wrap(
                "path entry validation failed",
                FieldContext::new("path", self.path.path.as_str(), "valid path entry"),
            )
        })?;
        if self.kind.is_file_like() {
            if let Some(inheritance) = &self.inheritance {
                return Err(EntryError::validation(
                    "inheritance must be absent for file paths",
                    FieldContext::new("inheritance", format!("{:?}", inheritance), "none for file paths"),
                ));
            }
            if let Some(metadata) = &self.metadata {
                return Err(EntryError::validation(
                    "metadata must be absent for file paths",
                    FieldContext::new("metadata", format!("{:?}", metadata), "none for file paths"),
                ));
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &str {
        &self.path.path
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path.set_path(path);
    }

    pub fn display_path(&self, is_windows: bool) -> String {
        self.path.display_path(is_windows)
    }

    pub fn is_directory(&self) -> bool {
        self.kind == PathMetadataType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == PathMetadataType::File
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self.kind, PathMetadataType::FileSymlink | PathMetadataType::DirectorySymlink)
            || self.path.is_symlink
    }

    /// Filesystem link target, falling back to the path's own annotation
    pub fn link_target(&self) -> &str {
        if self.filesystem.link_target.is_empty() {
            &self.path.link_target
        } else {
            &self.filesystem.link_target
        }
    }

    /// Path a symlink points at; the path itself when there is no target.
    pub fn resolve_symlink(&self) -> String {
        match self.link_target() {
            "" => self.path().to_string(),
            target => path_entry::resolve_link(self.path(), target),
        }
    }

    /// Priority of this node when it passes tags down, if enabled
    pub fn inheritance_priority(&self) -> Option<i32> {
        self.inheritance.filter(|i| i.enabled).map(|i| i.priority)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            EntryError::validation(
                "failed to serialize path metadata",
                FieldContext::new("path", self.path(), "serializable path metadata"),
            )
            .with_source(e)
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let entry: Self = serde_json::from_str(text).map_err(|e| {
            EntryError::corruption(
                "failed to parse path metadata",
                FieldContext::new("path_metadata", format!("line {} column {}", e.line(), e.column()), "valid path metadata JSON"),
            )
            .with_source(e)
        })?;
        entry.validate()?;
        Ok(entry)
    }
}
