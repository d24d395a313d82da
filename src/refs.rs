//! Minimal read-only views of entries
//!
//! Code that only needs an entry's identity and paths can take these
//! traits instead of the concrete types.

use crate::file_entry::FileEntry;
use crate::path_entry::PathEntry;
use crate::path_metadata::PathMetadataEntry;

pub trait FileEntryRef {
    fn file_id(&self) -> u64;

    fn paths(&self) -> &[PathEntry];
}

pub trait PathMetadataEntryRef {
    fn path(&self) -> &str;

    fn path_entry(&self) -> &PathEntry;
}

impl FileEntryRef for FileEntry {
    fn file_id(&self) -> u64 {
        self.header.file_id
    }

    fn paths(&self) -> &[PathEntry] {
        &self.paths
    }
}

impl PathMetadataEntryRef for PathMetadataEntry {
    fn path(&self) -> &str {
        &self.path.path
    }

    fn path_entry(&self) -> &PathEntry {
        &self.path
    }
}

/// Whether `path` names one of `file`'s paths
pub fn matches_file<F, P>(file: &F, path: &P) -> bool
where
    F: FileEntryRef + ?Sized,
    P: PathMetadataEntryRef + ?Sized,
{
    file.paths().iter().any(|p| p.path == path.path())
}
