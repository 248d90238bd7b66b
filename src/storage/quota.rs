//! Quota Management
//!
//! Tracks each registered user's capacity and the bytes their files use.
//! Capacity is only enforced when a file is added; merges and restores may
//! leave a user over capacity.

use super::{StorageError, ADMIN_ID};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// User's storage record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserQuota {
    /// User ID
    pub user_id: String,
    /// Total bytes this user may store
    pub capacity: i64,
    /// Total bytes used by this user's files
    pub used: i64,
}

impl UserQuota {
    pub fn new(user_id: String, capacity: i64) -> Self {
        Self {
            user_id,
            capacity,
            used: 0,
        }
    }

    /// Capacity left, negative when over capacity
    pub fn remaining(&self) -> i64 {
        self.capacity.saturating_sub(self.used)
    }

    /// Check if user can store `size` more bytes. A total past `i64::MAX`
    /// never fits.
    pub fn can_upload(&self, size: i64) -> bool {
        self.used
            .checked_add(size)
            .map_or(false, |total| total <= self.capacity)
    }
}

/// Result of quota check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaCheckResult {
    Allowed,
    InsufficientQuota { used: i64, capacity: i64, requested: i64 },
}

/// Quota Manager - handles all quota operations
#[derive(Debug, Default)]
pub struct QuotaManager {
    quotas: HashMap<String, UserQuota>,
}

impl QuotaManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with `used = 0`. Capacity is stored as given.
    pub fn add_user(&mut self, user_id: &str, capacity: i64) -> Result<(), StorageError> {
        if user_id == ADMIN_ID {
            return Err(StorageError::ReservedIdentity(user_id.to_string()));
        }
        if self.quotas.contains_key(user_id) {
            return Err(StorageError::UserExists(user_id.to_string()));
        }

        self.quotas
            .insert(user_id.to_string(), UserQuota::new(user_id.to_string(), capacity));
        Ok(())
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.quotas.contains_key(user_id)
    }

    pub fn get(&self, user_id: &str) -> Option<&UserQuota> {
        self.quotas.get(user_id)
    }

    /// Check if user can upload
    pub fn can_upload(&self, user_id: &str, size: i64) -> Result<QuotaCheckResult, StorageError> {
        let quota = self
            .quotas
            .get(user_id)
            .ok_or_else(|| StorageError::UserNotFound(user_id.to_string()))?;

        if quota.can_upload(size) {
            Ok(QuotaCheckResult::Allowed)
        } else {
            Ok(QuotaCheckResult::InsufficientQuota {
                used: quota.used,
                capacity: quota.capacity,
                requested: size,
            })
        }
    }

    /// Record bytes added to a user's files. Unknown users (admin) are ignored.
    pub fn record_upload(&mut self, user_id: &str, size: i64) {
        if let Some(quota) = self.quotas.get_mut(user_id) {
            quota.used = quota.used.saturating_add(size);
        }
    }

    /// Record bytes removed from a user's files. No floor at zero.
    pub fn record_deletion(&mut self, user_id: &str, size: i64) {
        if let Some(quota) = self.quotas.get_mut(user_id) {
            quota.used = quota.used.saturating_sub(size);
        }
    }

    /// Overwrite a user's `used` total
    pub fn set_used(&mut self, user_id: &str, used: i64) {
        if let Some(quota) = self.quotas.get_mut(user_id) {
            quota.used = used;
        }
    }

    /// Remove `absorbed` and add its capacity and usage to `target`.
    /// Returns the target's remaining capacity.
    pub fn merge(&mut self, target: &str, absorbed: &str) -> Result<i64, StorageError> {
        if !self.quotas.contains_key(target) {
            return Err(StorageError::UserNotFound(target.to_string()));
        }
        if target == absorbed {
            return Err(StorageError::SelfMerge(target.to_string()));
        }
        let (capacity, used) = {
            let kept = &self.quotas[target];
            let gone = self
                .quotas
                .get(absorbed)
                .ok_or_else(|| StorageError::UserNotFound(absorbed.to_string()))?;
            match (
                kept.capacity.checked_add(gone.capacity),
                kept.used.checked_add(gone.used),
            ) {
                (Some(capacity), Some(used)) => (capacity, used),
                _ => return Err(StorageError::QuotaOverflow(target.to_string())),
            }
        };

        self.quotas.remove(absorbed);
        let quota = self
            .quotas
            .get_mut(target)
            .ok_or_else(|| StorageError::UserNotFound(target.to_string()))?;
        quota.capacity = capacity;
        quota.used = used;
        Ok(quota.remaining())
    }

    /// Remaining capacity of a user
    pub fn remaining(&self, user_id: &str) -> Option<i64> {
        self.quotas.get(user_id).map(UserQuota::remaining)
    }

    /// Number of registered users
    pub fn user_count(&self) -> usize {
        self.quotas.len()
    }
}

/// User quota summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSummary {
    pub capacity: i64,
    pub used: i64,
    pub remaining: i64,
    pub files_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_is_reserved() {
        let mut manager = QuotaManager::new();

        assert_eq!(
            manager.add_user(ADMIN_ID, 100),
            Err(StorageError::ReservedIdentity(ADMIN_ID.into()))
        );
        assert!(manager.add_user("user1", 100).is_ok());
        assert_eq!(
            manager.add_user("user1", 100),
            Err(StorageError::UserExists("user1".into()))
        );
        assert_eq!(manager.user_count(), 1);
    }

    #[test]
    fn test_quota_enforcement() {
        let mut manager = QuotaManager::new();
        manager.add_user("user1", 1000).unwrap();
        manager.record_upload("user1", 600);

        // Exactly at capacity is allowed
        assert_eq!(manager.can_upload("user1", 400), Ok(QuotaCheckResult::Allowed));
        assert_eq!(
            manager.can_upload("user1", 401),
            Ok(QuotaCheckResult::InsufficientQuota {
                used: 600,
                capacity: 1000,
                requested: 401
            })
        );
        assert!(matches!(
            manager.can_upload("ghost", 1),
            Err(StorageError::UserNotFound(_))
        ));
    }

    #[test]
    fn test_deletion_has_no_floor() {
        let mut manager = QuotaManager::new();
        manager.add_user("user1", 10).unwrap();
        manager.record_deletion("user1", 25);

        assert_eq!(manager.get("user1").unwrap().used, -25);
        assert_eq!(manager.remaining("user1"), Some(35));
    }

    #[test]
    fn test_merge_sums_and_removes() {
        let mut manager = QuotaManager::new();
        manager.add_user("a", 100).unwrap();
        manager.add_user("b", 50).unwrap();
        manager.record_upload("a", 90);
        manager.record_upload("b", 45);

        assert_eq!(manager.merge("a", "b"), Ok(15));
        assert!(!manager.contains("b"));

        let a = manager.get("a").unwrap();
        assert_eq!((a.capacity, a.used), (150, 135));

        assert_eq!(manager.merge("a", "a"), Err(StorageError::SelfMerge("a".into())));
        assert_eq!(manager.merge("a", "b"), Err(StorageError::UserNotFound("b".into())));
    }

    #[test]
    fn test_upload_past_i64_max_is_refused() {
        let mut manager = QuotaManager::new();
        manager.add_user("user1", i64::MAX).unwrap();
        manager.record_upload("user1", 1);

        assert!(matches!(
            manager.can_upload("user1", i64::MAX),
            Ok(QuotaCheckResult::InsufficientQuota { .. })
        ));
        assert_eq!(manager.remaining("user1"), Some(i64::MAX - 1));

        manager.set_used("user1", i64::MIN);
        manager.record_deletion("user1", 1);
        assert_eq!(manager.get("user1").unwrap().used, i64::MIN);
        assert_eq!(manager.remaining("user1"), Some(i64::MAX));
    }

    #[test]
    fn test_merge_overflow_leaves_both_users() {
        let mut manager = QuotaManager::new();
        manager.add_user("a", i64::MAX).unwrap();
        manager.add_user("b", 1).unwrap();

        assert_eq!(manager.merge("a", "b"), Err(StorageError::QuotaOverflow("a".into())));
        assert!(manager.contains("b"));
        assert_eq!(manager.get("a").unwrap().capacity, i64::MAX);
    }

    #[test]
    fn test_uploads_for_admin_are_ignored() {
        let mut manager = QuotaManager::new();
        manager.record_upload(ADMIN_ID, 500);
        manager.record_deletion(ADMIN_ID, 500);
        assert_eq!(manager.user_count(), 0);
    }
}
