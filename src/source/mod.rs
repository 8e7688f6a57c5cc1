//! Read-only access to the module tree.
//!
//! # Responsibilities
//! - List child directories of a path (role and module discovery)
//! - Read text files (route files, views, layouts, translations)
//!
//! # Design Decisions
//! - Discovery and rendering never touch `std::fs` directly
//! - A missing file is `Ok(None)`, not an error; callers decide severity
//! - Directory listings are sorted so load order is deterministic

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem abstraction used by route discovery and view rendering.
pub trait SourceTree: Send + Sync + std::fmt::Debug {
    /// Names of the directories directly below `path`, sorted.
    /// A missing `path` yields an empty list.
    fn list_dirs(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Contents of the file at `path`, or `None` if it does not exist.
    fn read_file(&self, path: &Path) -> io::Result<Option<String>>;
}

/// Source tree backed by the real filesystem.
#[derive(Debug, Clone, Default)]
pub struct DiskTree;

impl SourceTree for DiskTree {
    fn list_dirs(&self, path: &Path) -> io::Result<Vec<String>> {
        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                } else {
                    tracing::warn!(path = ?entry.path(), "Skipping directory with non UTF-8 name");
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_file(&self, path: &Path) -> io::Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// In-memory source tree. Directories exist implicitly as parents of files.
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, returning the tree for chaining.
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }
}

impl SourceTree for MemoryTree {
    fn list_dirs(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names: Vec<String> = self
            .files
            .keys()
            .filter_map(|file| file.strip_prefix(path).ok())
            .filter_map(|rest| {
                let mut components = rest.components();
                let first = components.next()?;
                // a direct file child is not a directory
                components.next()?;
                first.as_os_str().to_str().map(str::to_string)
            })
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn read_file(&self, path: &Path) -> io::Result<Option<String>> {
        Ok(self.files.get(path).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_tree_lists_only_directories() {
        let tree = MemoryTree::new()
            .with_file("modules/App/Home/routes.toml", "")
            .with_file("modules/App/News/Views/list.html", "")
            .with_file("modules/Admin/Users/routes.toml", "")
            .with_file("modules/readme.txt", "");

        let roles = tree.list_dirs(Path::new("modules")).unwrap();
        assert_eq!(roles, vec!["Admin", "App"]);

        let modules = tree.list_dirs(Path::new("modules/App")).unwrap();
        assert_eq!(modules, vec!["Home", "News"]);

        assert!(tree.list_dirs(Path::new("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_memory_tree_read_missing_is_none() {
        let tree = MemoryTree::new().with_file("a/b.txt", "hello");
        assert_eq!(tree.read_file(Path::new("a/b.txt")).unwrap().as_deref(), Some("hello"));
        assert!(tree.read_file(Path::new("a/c.txt")).unwrap().is_none());
    }

    #[test]
    fn test_disk_tree_sorted_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Zeta")).unwrap();
        fs::create_dir_all(dir.path().join("Alpha")).unwrap();
        fs::write(dir.path().join("file.txt"), "x").unwrap();

        let tree = DiskTree;
        assert_eq!(tree.list_dirs(dir.path()).unwrap(), vec!["Alpha", "Zeta"]);
        assert!(tree.list_dirs(&dir.path().join("nope")).unwrap().is_empty());
        assert!(tree.read_file(&dir.path().join("nope.txt")).unwrap().is_none());
        assert_eq!(tree.read_file(&dir.path().join("file.txt")).unwrap().as_deref(), Some("x"));
    }
}
