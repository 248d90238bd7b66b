//! Storage Engine - the stateful core
//!
//! Combines the file index, user quotas and backup slots. Every `try_*`
//! operation validates its inputs before mutating anything, so an `Err`
//! always leaves the engine untouched.

use super::{
    BackupSnapshot, BackupStore, CloudStorage, FileManager, QuotaCheckResult, QuotaManager,
    QuotaSummary, StorageError, UserQuota, ADMIN_ID,
};
use crate::CloudStorageConfig;

/// In-memory storage engine
#[derive(Debug, Default)]
pub struct StorageEngine {
    files: FileManager,
    quotas: QuotaManager,
    backups: BackupStore,
}

impl StorageEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with the configured users registered
    pub fn from_config(config: &CloudStorageConfig) -> crate::Result<Self> {
        let mut engine = Self::new();
        for seed in &config.users {
            engine.try_add_user(&seed.user_id, seed.capacity)?;
        }
        tracing::info!("Storage engine ready with {} user(s)", config.users.len());
        Ok(engine)
    }

    /// Add an admin-owned file. Admin space is unlimited.
    pub fn try_add_file(&mut self, name: &str, size: i64) -> Result<(), StorageError> {
        self.files.insert(name, size, ADMIN_ID)?;
        tracing::debug!("Added file {} ({} bytes)", name, size);
        Ok(())
    }

    /// Delete a file and return its size
    pub fn try_delete_file(&mut self, name: &str) -> Result<i64, StorageError> {
        let entry = self
            .files
            .remove(name)
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()))?;

        self.quotas.record_deletion(&entry.owner_id, entry.size);
        tracing::debug!("Deleted file {} owned by {}", name, entry.owner_id);
        Ok(entry.size)
    }

    /// Register a user with the given capacity
    pub fn try_add_user(&mut self, user_id: &str, capacity: i64) -> Result<(), StorageError> {
        self.quotas.add_user(user_id, capacity)?;
        tracing::debug!("Added user {} with capacity {}", user_id, capacity);
        Ok(())
    }

    /// Add a file owned by `user_id`; returns the remaining capacity
    pub fn try_add_file_by(
        &mut self,
        user_id: &str,
        name: &str,
        size: i64,
    ) -> Result<i64, StorageError> {
        let check = self.quotas.can_upload(user_id, size)?;
        if self.files.contains(name) {
            return Err(StorageError::FileExists(name.to_string()));
        }
        if let QuotaCheckResult::InsufficientQuota { used, capacity, requested } = check {
            return Err(StorageError::QuotaExceeded {
                user_id: user_id.to_string(),
                requested,
                available: capacity.saturating_sub(used),
            });
        }

        self.files.insert(name, size, user_id)?;
        self.quotas.record_upload(user_id, size);

        let remaining = self.quotas.remaining(user_id).unwrap_or_default();
        tracing::debug!("User {} added {} ({} bytes), {} remaining", user_id, name, size, remaining);
        Ok(remaining)
    }

    /// Fold `absorbed` into `target`: files change owner, capacity and usage
    /// are summed, and `absorbed`'s record and backup are dropped. The merged
    /// user may end up over capacity.
    pub fn try_merge_user(&mut self, target: &str, absorbed: &str) -> Result<i64, StorageError> {
        let remaining = self.quotas.merge(target, absorbed)?;
        let moved = self.files.reassign_owner(absorbed, target);
        self.backups.discard(absorbed);

        tracing::debug!("Merged user {} into {} ({} files moved)", absorbed, target, moved);
        Ok(remaining)
    }

    /// Replace `identity`'s snapshot with its current files; returns the
    /// number of files captured
    pub fn try_backup_user(&mut self, identity: &str) -> Result<i64, StorageError> {
        self.check_identity(identity)?;

        let snapshot: BackupSnapshot = self
            .files
            .owned_by(identity)
            .into_iter()
            .filter_map(|name| {
                let size = self.files.get(&name)?.size;
                Some((name, size))
            })
            .collect();
        let count = snapshot.len() as i64;

        self.backups.store(identity, snapshot);
        tracing::debug!("Backed up {} file(s) for {}", count, identity);
        Ok(count)
    }

    /// Roll `identity`'s files back to its snapshot; returns the number of
    /// files recreated, overwritten or reclaimed.
    ///
    /// Without a snapshot every file of `identity` is deleted. When restoring
    /// the admin identity, snapshot files now owned by a user are taken back.
    /// A registered user's `used` is recomputed from its files at the end.
    pub fn try_restore_user(&mut self, identity: &str) -> Result<i64, StorageError> {
        self.check_identity(identity)?;
        let registered = self.quotas.contains(identity);
        let current = self.files.owned_by(identity);

        let Some(snapshot) = self.backups.get(identity) else {
            for name in &current {
                self.files.remove(name);
            }
            if registered {
                self.quotas.set_used(identity, 0);
            }
            tracing::debug!("No backup for {}, removed {} file(s)", identity, current.len());
            return Ok(0);
        };

        for name in current.iter().filter(|name| !snapshot.contains(name)) {
            self.files.remove(name);
        }

        let mut restored = 0;
        for (name, &size) in &snapshot.files {
            match self.files.get_mut(name) {
                Some(entry) if entry.owner_id != identity => {
                    if identity != ADMIN_ID {
                        continue;
                    }
                    let previous_owner = std::mem::replace(&mut entry.owner_id, ADMIN_ID.to_string());
                    let previous_size = std::mem::replace(&mut entry.size, size);
                    self.quotas.record_deletion(&previous_owner, previous_size);
                    tracing::info!("Admin reclaimed {} from {}", name, previous_owner);
                    restored += 1;
                }
                Some(entry) => {
                    let delta = size.saturating_sub(entry.size);
                    entry.size = size;
                    self.quotas.record_upload(identity, delta);
                    restored += 1;
                }
                None => {
                    self.files.put(name, size, identity);
                    self.quotas.record_upload(identity, size);
                    restored += 1;
                }
            }
        }

        if registered {
            let total = self.files.total_owned_by(identity);
            self.quotas.set_used(identity, total);
        }

        tracing::debug!("Restored {} file(s) for {}", restored, identity);
        Ok(restored)
    }

    /// Owner of a file
    pub fn owner_of(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(|f| f.owner_id.as_str())
    }

    /// Files owned by `identity` as (name, size), sorted by name
    pub fn files_owned_by(&self, identity: &str) -> Vec<(String, i64)> {
        self.files
            .owned_by(identity)
            .into_iter()
            .filter_map(|name| {
                let size = self.files.get(&name)?.size;
                Some((name, size))
            })
            .collect()
    }

    /// Get file count
    pub fn file_count(&self) -> usize {
        self.files.file_count()
    }

    /// Whether `user_id` is a registered user (never true for admin)
    pub fn is_user(&self, user_id: &str) -> bool {
        self.quotas.contains(user_id)
    }

    /// Quota record of a registered user
    pub fn user_quota(&self, user_id: &str) -> Option<&UserQuota> {
        self.quotas.get(user_id)
    }

    /// Get user's quota summary
    pub fn quota_summary(&self, user_id: &str) -> Option<QuotaSummary> {
        let quota = self.quotas.get(user_id)?;
        Some(QuotaSummary {
            capacity: quota.capacity,
            used: quota.used,
            remaining: quota.remaining(),
            files_count: self.files.owned_by(user_id).len(),
        })
    }

    /// Current snapshot of an identity, if any
    pub fn backup_of(&self, identity: &str) -> Option<&BackupSnapshot> {
        self.backups.get(identity)
    }

    /// Backup and restore accept the admin identity or a registered user
    fn check_identity(&self, identity: &str) -> Result<(), StorageError> {
        if identity == ADMIN_ID || self.quotas.contains(identity) {
            Ok(())
        } else {
            Err(StorageError::UserNotFound(identity.to_string()))
        }
    }
}

/// Collapse a failure into the `None` sentinel, logging the reason
fn rejected<T>(result: Result<T, StorageError>) -> Option<T> {
    result
        .map_err(|e| tracing::debug!("Rejected: {}", e))
        .ok()
}

impl CloudStorage for StorageEngine {
    fn add_file(&mut self, name: &str, size: i64) -> bool {
        rejected(self.try_add_file(name, size)).is_some()
    }

    fn get_file_size(&self, name: &str) -> Option<i64> {
        self.files.get(name).map(|f| f.size)
    }

    fn delete_file(&mut self, name: &str) -> Option<i64> {
        rejected(self.try_delete_file(name))
    }

    fn get_n_largest(&self, prefix: &str, n: usize) -> Vec<String> {
        self.files
            .n_largest(prefix, n)
            .into_iter()
            .map(|(name, size)| format!("{}({})", name, size))
            .collect()
    }

    fn add_user(&mut self, user_id: &str, capacity: i64) -> bool {
        rejected(self.try_add_user(user_id, capacity)).is_some()
    }

    fn add_file_by(&mut self, user_id: &str, name: &str, size: i64) -> Option<i64> {
        rejected(self.try_add_file_by(user_id, name, size))
    }

    fn merge_user(&mut self, user_id_1: &str, user_id_2: &str) -> Option<i64> {
        rejected(self.try_merge_user(user_id_1, user_id_2))
    }

    fn backup_user(&mut self, user_id: &str) -> Option<i64> {
        rejected(self.try_backup_user(user_id))
    }

    fn restore_user(&mut self, user_id: &str) -> Option<i64> {
        rejected(self.try_restore_user(user_id))
    }
}
