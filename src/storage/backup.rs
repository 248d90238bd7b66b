//! Backup snapshots - one retained generation per identity

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Copy of an identity's files at backup time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    /// File name -> size
    pub files: BTreeMap<String, i64>,
}

impl BackupSnapshot {
    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<(String, i64)> for BackupSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

/// Snapshot slots keyed by identity
#[derive(Debug, Default)]
pub struct BackupStore {
    slots: HashMap<String, BackupSnapshot>,
}

impl BackupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `snapshot`, replacing any earlier one for `identity`
    pub fn store(&mut self, identity: &str, snapshot: BackupSnapshot) -> Option<BackupSnapshot> {
        self.slots.insert(identity.to_string(), snapshot)
    }

    pub fn get(&self, identity: &str) -> Option<&BackupSnapshot> {
        self.slots.get(identity)
    }

    /// Drop an identity's snapshot
    pub fn discard(&mut self, identity: &str) -> Option<BackupSnapshot> {
        self.slots.remove(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_generation() {
        let mut store = BackupStore::new();

        let first: BackupSnapshot = [("/a".to_string(), 1)].into_iter().collect();
        let second: BackupSnapshot = [("/b".to_string(), 2), ("/c".to_string(), 3)]
            .into_iter()
            .collect();

        assert!(store.store("u1", first.clone()).is_none());
        assert_eq!(store.store("u1", second), Some(first));

        let current = store.get("u1").unwrap();
        assert_eq!(current.len(), 2);
        assert!(!current.contains("/a"));

        assert!(store.discard("u1").is_some());
        assert!(store.get("u1").is_none());
    }
}
