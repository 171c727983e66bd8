//! Inode ↔ path mapping.
//!
//! The kernel speaks inodes, the VFS speaks paths. Inodes are handed out on
//! first sight of a path and never reused; like every other cache in the
//! mount, the table only grows.

use std::collections::HashMap;

use alveofs_kernel::remote::path;

/// Inode of the mount root.
pub const ROOT_INO: u64 = 1;

/// Bidirectional inode table. The root is inode 1 with path `""`.
#[derive(Debug)]
pub struct InodeTable {
    paths: HashMap<u64, String>,
    inodes: HashMap<String, u64>,
    next: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    /// Create a table holding only the root.
    pub fn new() -> Self {
        let mut paths = HashMap::new();
        let mut inodes = HashMap::new();
        paths.insert(ROOT_INO, String::new());
        inodes.insert(String::new(), ROOT_INO);
        Self {
            paths,
            inodes,
            next: ROOT_INO + 1,
        }
    }

    /// Path of `ino`.
    pub fn path(&self, ino: u64) -> Option<&str> {
        self.paths.get(&ino).map(String::as_str)
    }

    /// Inode of `path`, if assigned.
    pub fn inode(&self, path: &str) -> Option<u64> {
        self.inodes.get(path).copied()
    }

    /// Inode of `path`, assigning the next free one on first sight.
    pub fn get_or_insert(&mut self, path: &str) -> u64 {
        if let Some(ino) = self.inodes.get(path) {
            return *ino;
        }
        let ino = self.next;
        self.next += 1;
        self.paths.insert(ino, path.to_string());
        self.inodes.insert(path.to_string(), ino);
        ino
    }

    /// Path of `name` inside directory `parent`.
    pub fn child_path(&self, parent: u64, name: &str) -> Option<String> {
        self.path(parent).map(|p| path::join(p, name))
    }

    /// Inode of the directory containing `ino`. The root is its own parent.
    pub fn parent(&mut self, ino: u64) -> Option<u64> {
        let path = self.path(ino)?;
        if path.is_empty() {
            return Some(ROOT_INO);
        }
        let parent = path::split(path).0.to_string();
        Some(self.get_or_insert(&parent))
    }

    /// Number of known inodes, root included.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Always false; the root is always present.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root() {
        let table = InodeTable::new();
        assert_eq!(table.path(ROOT_INO), Some(""));
        assert_eq!(table.inode(""), Some(ROOT_INO));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_stable_assignment() {
        let mut table = InodeTable::new();
        let a = table.get_or_insert("austalk");
        let b = table.get_or_insert("austalk/1_1");
        assert_ne!(a, b);
        assert_eq!(table.get_or_insert("austalk"), a);
        assert_eq!(table.path(b), Some("austalk/1_1"));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_child_and_parent() {
        let mut table = InodeTable::new();
        assert_eq!(table.child_path(ROOT_INO, "austalk").as_deref(), Some("austalk"));

        let item = table.get_or_insert("austalk/1_1");
        assert_eq!(table.child_path(item, "document").as_deref(), Some("austalk/1_1/document"));

        let parent = table.parent(item).unwrap();
        assert_eq!(table.path(parent), Some("austalk"));
        assert_eq!(table.parent(ROOT_INO), Some(ROOT_INO));
        assert!(table.parent(999).is_none());
        assert!(table.child_path(999, "x").is_none());
    }
}
