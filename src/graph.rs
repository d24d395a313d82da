//! Path hierarchy and file associations
//!
//! [`EntryGraph`] owns file entries and path metadata nodes and addresses
//! them through copyable handles. Each path node stores at most one parent
//! handle. File/path associations are a single set of `(PathId, FileId)`
//! pairs; both directions are read from it, so they cannot disagree.
//!
//! Malformed input can still produce parent cycles. Every walk up the tree
//! stops at the first node it has already visited.

use crate::error::{EntryError, FieldContext, Result};
use crate::file_entry::FileEntry;
use crate::path_entry;
use crate::path_metadata::PathMetadataEntry;
use crate::refs;
use crate::tags::{Tag, TagMap};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

/// Handle of a file entry inside an [`EntryGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(usize);

/// Handle of a path metadata node inside an [`EntryGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathId(usize);

impl FileId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl PathId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct PathNode {
    entry: PathMetadataEntry,
    parent: Option<PathId>,
}

/// Arena of file entries and path metadata with their relations
#[derive(Debug, Default)]
pub struct EntryGraph {
    files: Vec<FileEntry>,
    paths: Vec<PathNode>,
    links: BTreeSet<(PathId, FileId)>,
}

impl EntryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, entry: FileEntry) -> FileId {
        self.files.push(entry);
        FileId(self.files.len() - 1)
    }

    pub fn add_path(&mut self, entry: PathMetadataEntry) -> PathId {
        self.paths.push(PathNode { entry, parent: None });
        PathId(self.paths.len() - 1)
    }

    pub fn file(&self, id: FileId) -> Option<&FileEntry> {
        self.files.get(id.0)
    }

    /// Mutable access to a file entry.
    ///
    /// Changing its paths can leave associations that no longer match;
    /// see [`EntryGraph::prune_associations`].
    pub fn file_mut(&mut self, id: FileId) -> Option<&mut FileEntry> {
        self.files.get_mut(id.0)
    }

    pub fn path(&self, id: PathId) -> Option<&PathMetadataEntry> {
        self.paths.get(id.0).map(|n| &n.entry)
    }

    pub fn path_mut(&mut self, id: PathId) -> Option<&mut PathMetadataEntry> {
        self.paths.get_mut(id.0).map(|n| &mut n.entry)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn file_ids(&self) -> impl Iterator<Item = FileId> {
        (0..self.files.len()).map(FileId)
    }

    pub fn path_ids(&self) -> impl Iterator<Item = PathId> {
        (0..self.paths.len()).map(PathId)
    }

    /// First node whose path string equals `path`
    pub fn find_path(&self, path: &str) -> Option<PathId> {
        self.paths.iter().position(|n| n.entry.path() == path).map(PathId)
    }

    fn node(&self, id: PathId) -> Result<&PathNode> {
        self.paths.get(id.0).ok_or_else(|| unknown_path(id))
    }

    fn file_ref(&self, id: FileId) -> Result<&FileEntry> {
        self.files.get(id.0).ok_or_else(|| unknown_file(id))
    }

    // Hierarchy

    /// Link `child` under `parent`, or detach it with `None`.
    pub fn set_parent(&mut self, child: PathId, parent: Option<PathId>) -> Result<()> {
        self.node(child)?;
        if let Some(parent) = parent {
            self.node(parent)?;
            if parent == child {
                return Err(EntryError::validation(
                    "path cannot be its own parent",
                    FieldContext::new("parent", parent.0, "a different path node"),
                ));
            }
        }
        self.paths[child.0].parent = parent;
        Ok(())
    }

    pub fn parent(&self, id: PathId) -> Option<PathId> {
        self.paths.get(id.0).and_then(|n| n.parent)
    }

    /// Path string of the parent node; empty for a root
    pub fn parent_path_string(&self, id: PathId) -> String {
        self.parent(id)
            .and_then(|p| self.path(p))
            .map(|p| p.path().to_string())
            .unwrap_or_default()
    }

    /// Parent chain, nearest first
    pub fn ancestors(&self, id: PathId) -> Vec<PathId> {
        let mut visited = HashSet::from([id]);
        let mut chain = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            if !visited.insert(node) {
                warn!(path = id.0, revisited = node.0, "cycle in path hierarchy");
                break;
            }
            chain.push(node);
            current = self.parent(node);
        }
        chain
    }

    /// Number of parent hops up to the root
    pub fn depth(&self, id: PathId) -> usize {
        self.ancestors(id).len()
    }

    pub fn is_root(&self, id: PathId) -> bool {
        self.parent(id).is_none()
    }

    // Tags

    /// Tags passed down by ancestors with inheritance enabled.
    ///
    /// Ancestors are ranked by priority, highest first, nearer ones first on
    /// ties. The first ranked ancestor carrying a key supplies it.
    pub fn inherited_tags(&self, id: PathId) -> Result<TagMap> {
        self.node(id)?;
        let mut ranked: Vec<(i32, &PathMetadataEntry)> = self
            .ancestors(id)
            .into_iter()
            .filter_map(|a| {
                let entry = &self.paths[a.0].entry;
                entry.inheritance_priority().map(|p| (p, entry))
            })
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0));

        let mut inherited = TagMap::new();
        for (_, entry) in ranked {
            inherited.merge_missing(&entry.tag_map());
        }
        Ok(inherited)
    }

    /// Direct tags, then inherited tags, then tags of associated files.
    ///
    /// An associated file whose tags cannot be read is skipped.
    pub fn effective_tags(&self, id: PathId) -> Result<TagMap> {
        let mut tags = self.node(id)?.entry.tag_map();
        tags.merge_missing(&self.inherited_tags(id)?);
        for file_id in self.associated_files(id) {
            match self.files[file_id.0].peek_tags().into_result() {
                Ok(file_tags) => tags.merge_missing(&file_tags),
                Err(e) => debug!(file = file_id.0, error = %e, "skipping file tags"),
            }
        }
        Ok(tags)
    }

    /// File tags first, then the effective tags of each associated path.
    pub fn file_effective_tags(&self, file: FileId) -> Result<TagMap> {
        let mut tags = self.file_ref(file)?.peek_tags().into_result()?;
        for path in self.file_path_metadata(file) {
            match self.effective_tags(path) {
                Ok(path_tags) => tags.merge_missing(&path_tags),
                Err(e) => debug!(path = path.0, error = %e, "skipping path tags"),
            }
        }
        Ok(tags)
    }

    /// Inherited tags of every associated path; later paths replace keys.
    pub fn file_inherited_tags(&self, file: FileId) -> Result<TagMap> {
        self.file_ref(file)?;
        let mut tags = TagMap::new();
        for path in self.file_path_metadata(file) {
            if let Ok(inherited) = self.inherited_tags(path) {
                for tag in inherited.into_vec() {
                    tags.insert(tag);
                }
            }
        }
        Ok(tags)
    }

    /// Effective tags of a path as a list, in key order.
    pub fn effective_tag_list(&self, id: PathId) -> Result<Vec<Tag>> {
        Ok(self.effective_tags(id)?.into_vec())
    }

    // Associations

    /// Associate a path node with a file entry that carries the same path.
    ///
    /// A file holds at most one path node per path string, so an earlier
    /// node linked under the same string is dissociated. Associating an
    /// existing pair again is a no-op.
    pub fn associate(&mut self, path: PathId, file: FileId) -> Result<()> {
        let node = self.node(path)?;
        let entry = self.file_ref(file)?;
        let path_str = node.entry.path().to_string();
        if !refs::matches_file(entry, &node.entry) {
            return Err(EntryError::validation(
                "path does not match any file entry path",
                FieldContext::new("path", &path_str, format!("one of {:?}", entry.path_strings())),
            ));
        }
        let file_id = entry.file_id();
        let replaced: Vec<PathId> = self
            .file_path_metadata(file)
            .into_iter()
            .filter(|&p| p != path && self.paths[p.0].entry.path() == path_str)
            .collect();
        for old in replaced {
            self.links.remove(&(old, file));
            debug!(path = path_str.as_str(), file_id, replaced = old.0, "replaced path metadata association");
        }
        if self.links.insert((path, file)) {
            debug!(path = path_str.as_str(), file_id, "associated path metadata");
        }
        Ok(())
    }

    /// Remove an association; `false` when the pair was not linked.
    pub fn dissociate(&mut self, path: PathId, file: FileId) -> bool {
        self.links.remove(&(path, file))
    }

    pub fn is_associated(&self, path: PathId, file: FileId) -> bool {
        self.links.contains(&(path, file))
    }

    /// Path node associated with `file` under the path string `path`
    pub fn path_metadata_for(&self, file: FileId, path: &str) -> Option<PathId> {
        self.file_path_metadata(file)
            .into_iter()
            .find(|p| self.paths[p.0].entry.path() == path)
    }

    /// Files associated with a path node, in handle order
    pub fn associated_files(&self, path: PathId) -> Vec<FileId> {
        self.links
            .range((path, FileId(0))..=(path, FileId(usize::MAX)))
            .map(|&(_, f)| f)
            .collect()
    }

    /// Path nodes associated with a file, in handle order
    pub fn file_path_metadata(&self, file: FileId) -> Vec<PathId> {
        self.links.iter().filter(|(_, f)| *f == file).map(|&(p, _)| p).collect()
    }

    /// Drop associations whose path no longer appears among the file's
    /// paths. Returns how many were dropped.
    pub fn prune_associations(&mut self) -> usize {
        let before = self.links.len();
        let files = &self.files;
        let paths = &self.paths;
        self.links
            .retain(|&(p, f)| refs::matches_file(&files[f.0], &paths[p.0].entry));
        let dropped = before - self.links.len();
        if dropped > 0 {
            debug!(dropped, "pruned stale path associations");
        }
        dropped
    }

    // Directory helpers for files

    /// Parent directory of the first associated path that has one
    pub fn file_parent_path(&self, file: FileId) -> String {
        self.file_path_metadata(file)
            .into_iter()
            .map(|p| self.paths[p.0].entry.path())
            .filter(|path| !path.is_empty())
            .map(|path| (path, path_entry::parent_dir(path)))
            .find(|(path, parent)| parent.as_str() != "." && parent.as_str() != *path)
            .map(|(_, parent)| parent)
            .unwrap_or_default()
    }

    /// Depth of the first associated path; 0 without associations
    pub fn file_directory_depth(&self, file: FileId) -> usize {
        self.file_path_metadata(file)
            .first()
            .map(|&p| self.depth(p))
            .unwrap_or(0)
    }

    /// `true` unless some associated path has a parent
    pub fn file_is_root_relative(&self, file: FileId) -> bool {
        self.file_path_metadata(file).into_iter().all(|p| self.is_root(p))
    }
}

fn unknown_path(id: PathId) -> EntryError {
    EntryError::validation(
        "path metadata entry not found",
        FieldContext::new("path_id", id.0, "handle issued by this graph"),
    )
}

fn unknown_file(id: FileId) -> EntryError {
    EntryError::validation(
        "file entry not found",
        FieldContext::new("file_id", id.0, "handle issued by this graph"),
    )
}
