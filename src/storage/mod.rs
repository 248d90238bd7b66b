//! Storage Module - Files, user quotas and backup snapshots
//!
//! The [`StorageEngine`] owns three ledgers (file index, user quotas, backup
//! slots) and exposes the operations of the [`CloudStorage`] trait over them.

mod backup;
mod engine;
mod file_manager;
mod quota;
mod shared;

pub use backup::{BackupSnapshot, BackupStore};
pub use engine::StorageEngine;
pub use file_manager::{FileEntry, FileManager};
pub use quota::{QuotaCheckResult, QuotaManager, QuotaSummary, UserQuota};
pub use shared::SharedStorage;

use thiserror::Error;

/// Reserved identity owning files added without a user.
///
/// Never a registered user, but a valid backup/restore target.
pub const ADMIN_ID: &str = "admin";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("File already exists: {0}")]
    FileExists(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Identity is reserved: {0}")]
    ReservedIdentity(String),

    #[error("Quota exceeded for {user_id}: requested {requested}, available {available}")]
    QuotaExceeded {
        user_id: String,
        requested: i64,
        available: i64,
    },

    #[error("Merged quota for {0} does not fit in i64")]
    QuotaOverflow(String),

    #[error("Cannot merge user into itself: {0}")]
    SelfMerge(String),
}

/// The storage contract.
///
/// Failure is signalled only by `None` or `false`; no operation applies a
/// partial effect before failing.
pub trait CloudStorage {
    /// Add an admin-owned file. `false` if the name is taken.
    fn add_file(&mut self, name: &str, size: i64) -> bool;

    /// Size of a file, if it exists
    fn get_file_size(&self, name: &str) -> Option<i64>;

    /// Remove a file and return its size
    fn delete_file(&mut self, name: &str) -> Option<i64>;

    /// Up to `n` files starting with `prefix`, as `"name(size)"`, largest
    /// first and ties broken by name
    fn get_n_largest(&self, prefix: &str, n: usize) -> Vec<String>;

    /// Register a user. `false` for `"admin"` or an existing user.
    fn add_user(&mut self, user_id: &str, capacity: i64) -> bool;

    /// Add a file owned by `user_id` and return the user's remaining capacity
    fn add_file_by(&mut self, user_id: &str, name: &str, size: i64) -> Option<i64>;

    /// Fold `user_id_2` into `user_id_1` and return the remaining capacity
    fn merge_user(&mut self, user_id_1: &str, user_id_2: &str) -> Option<i64>;

    /// Snapshot every file owned by `user_id` and return the file count
    fn backup_user(&mut self, user_id: &str) -> Option<i64>;

    /// Roll `user_id`'s files back to its snapshot and return the restored count
    fn restore_user(&mut self, user_id: &str) -> Option<i64>;
}
