//! File Manager - File index and ownership
//!
//! Each file entry carries both its size and its owner, so a file can never
//! have one without the other.

use super::StorageError;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;

/// A stored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File size (bytes)
    pub size: i64,

    /// Owning identity: a user ID or the admin identity
    pub owner_id: String,
}

/// Manages the file index
#[derive(Debug, Default)]
pub struct FileManager {
    file_index: HashMap<String, FileEntry>,
}

impl FileManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file. Fails if the name is taken, whoever owns it.
    pub fn insert(&mut self, name: &str, size: i64, owner_id: &str) -> Result<(), StorageError> {
        if self.file_index.contains_key(name) {
            return Err(StorageError::FileExists(name.to_string()));
        }

        self.file_index.insert(
            name.to_string(),
            FileEntry {
                size,
                owner_id: owner_id.to_string(),
            },
        );
        Ok(())
    }

    /// Store a file under `name`, replacing any existing entry
    pub fn put(&mut self, name: &str, size: i64, owner_id: &str) {
        self.file_index.insert(
            name.to_string(),
            FileEntry {
                size,
                owner_id: owner_id.to_string(),
            },
        );
    }

    /// Get file entry by name
    pub fn get(&self, name: &str) -> Option<&FileEntry> {
        self.file_index.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FileEntry> {
        self.file_index.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.file_index.contains_key(name)
    }

    /// Delete file from index
    pub fn remove(&mut self, name: &str) -> Option<FileEntry> {
        self.file_index.remove(name)
    }

    /// Names of every file owned by `owner_id`, sorted
    pub fn owned_by(&self, owner_id: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .file_index
            .iter()
            .filter(|(_, f)| f.owner_id == owner_id)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Total size of every file owned by `owner_id`
    pub fn total_owned_by(&self, owner_id: &str) -> i64 {
        self.file_index
            .values()
            .filter(|f| f.owner_id == owner_id)
            .fold(0i64, |total, f| total.saturating_add(f.size))
    }

    /// Hand every file of `from` to `to`. Returns the number moved.
    pub fn reassign_owner(&mut self, from: &str, to: &str) -> usize {
        let mut moved = 0;
        for entry in self.file_index.values_mut() {
            if entry.owner_id == from {
                entry.owner_id = to.to_string();
                moved += 1;
            }
        }
        moved
    }

    /// Up to `n` files whose name starts with `prefix`, largest first,
    /// equal sizes ordered by name
    pub fn n_largest(&self, prefix: &str, n: usize) -> Vec<(&str, i64)> {
        let mut matches: Vec<(&str, i64)> = self
            .file_index
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, f)| (name.as_str(), f.size))
            .collect();

        matches.sort_by_key(|&(name, size)| (Reverse(size), name));
        matches.truncate(n);
        matches
    }

    /// Get file count
    pub fn file_count(&self) -> usize {
        self.file_index.len()
    }
}
