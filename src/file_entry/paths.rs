//! Path queries on a file entry

use super::FileEntry;
use crate::path_entry::{self, PathEntry};

impl FileEntry {
    pub fn has_path(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p.path == path)
    }

    pub fn path_strings(&self) -> Vec<&str> {
        self.paths.iter().map(|p| p.path.as_str()).collect()
    }

    pub fn has_symlinks(&self) -> bool {
        self.paths.iter().any(|p| p.is_symlink)
    }

    pub fn symlink_paths(&self) -> Vec<&PathEntry> {
        self.paths.iter().filter(|p| p.is_symlink).collect()
    }

    /// First path without its package-root '/' marker; empty when the entry
    /// has no paths
    pub fn primary_path(&self) -> String {
        self.paths
            .first()
            .map(|p| path_entry::display_path(&p.path, false))
            .unwrap_or_default()
    }

    /// Every path with symlinks replaced by their resolved targets
    pub fn resolve_all_symlinks(&self) -> Vec<String> {
        self.paths
            .iter()
            .map(|p| {
                if p.is_symlink && !p.link_target.is_empty() {
                    path_entry::resolve_link(&p.path, &p.link_target)
                } else {
                    p.path.clone()
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> FileEntry {
        let mut entry = FileEntry::new(3).with_path("/docs/guide.md");
        entry.add_path(PathEntry::new("/docs/latest.md").with_link_target("guide.md"));
        entry.add_path(PathEntry::new("/top.md").with_link_target("/docs/guide.md"));
        entry
    }

    #[test]
    fn test_symlink_queries() {
        let entry = entry();
        assert!(entry.has_symlinks());
        let links: Vec<&str> = entry.symlink_paths().iter().map(|p| p.path.as_str()).collect();
        assert_eq!(links, vec!["/docs/latest.md", "/top.md"]);
        assert!(!FileEntry::new(1).with_path("a").has_symlinks());
    }

    #[test]
    fn test_primary_path() {
        assert_eq!(entry().primary_path(), "docs/guide.md");
        assert_eq!(FileEntry::new(1).primary_path(), "");
    }

    #[test]
    fn test_resolve_all_symlinks() {
        assert_eq!(
            entry().resolve_all_symlinks(),
            vec!["/docs/guide.md", "/docs/guide.md", "/docs/guide.md"]
        );
    }

    #[test]
    fn test_has_path() {
        let entry = entry();
        assert!(entry.has_path("/top.md"));
        assert!(!entry.has_path("top.md"));
        assert_eq!(entry.path_strings().len(), 3);
    }
}
