//! Shared handle for multi-threaded hosts
//!
//! The engine defines no concurrent-access semantics, so the whole engine sits
//! behind one exclusive lock and every operation holds it until it completes.

use super::{CloudStorage, StorageEngine};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable, thread-safe handle to a single [`StorageEngine`]
#[derive(Debug, Clone, Default)]
pub struct SharedStorage {
    inner: Arc<Mutex<StorageEngine>>,
}

impl SharedStorage {
    pub fn new(engine: StorageEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Run `f` with exclusive access to the engine
    pub fn with<R>(&self, f: impl FnOnce(&mut StorageEngine) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl From<StorageEngine> for SharedStorage {
    fn from(engine: StorageEngine) -> Self {
        Self::new(engine)
    }
}

impl CloudStorage for SharedStorage {
    fn add_file(&mut self, name: &str, size: i64) -> bool {
        self.inner.lock().add_file(name, size)
    }

    fn get_file_size(&self, name: &str) -> Option<i64> {
        self.inner.lock().get_file_size(name)
    }

    fn delete_file(&mut self, name: &str) -> Option<i64> {
        self.inner.lock().delete_file(name)
    }

    fn get_n_largest(&self, prefix: &str, n: usize) -> Vec<String> {
        self.inner.lock().get_n_largest(prefix, n)
    }

    fn add_user(&mut self, user_id: &str, capacity: i64) -> bool {
        self.inner.lock().add_user(user_id, capacity)
    }

    fn add_file_by(&mut self, user_id: &str, name: &str, size: i64) -> Option<i64> {
        self.inner.lock().add_file_by(user_id, name, size)
    }

    fn merge_user(&mut self, user_id_1: &str, user_id_2: &str) -> Option<i64> {
        self.inner.lock().merge_user(user_id_1, user_id_2)
    }

    fn backup_user(&mut self, user_id: &str) -> Option<i64> {
        self.inner.lock().backup_user(user_id)
    }

    fn restore_user(&mut self, user_id: &str) -> Option<i64> {
        self.inner.lock().restore_user(user_id)
    }
}
