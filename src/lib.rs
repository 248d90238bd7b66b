//! Cloud Storage - In-memory file storage engine
//!
//! This crate provides a single-process storage engine with file CRUD,
//! per-user quota accounting, user merging, and single-slot backup/restore
//! snapshots. All state lives in memory; nothing is persisted.

pub mod storage;

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub use storage::{CloudStorage, SharedStorage, StorageEngine, StorageError, ADMIN_ID};

/// Main error type for cloud storage operations
#[derive(Error, Debug)]
pub enum CloudStorageError {
    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CloudStorageError>;

/// A user registered when an engine is built from configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSeed {
    pub user_id: String,
    pub capacity: i64,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudStorageConfig {
    /// Tracing filter directive (e.g. "info", "cloud_storage=debug")
    pub log_filter: String,

    /// Users registered on a fresh engine
    pub users: Vec<UserSeed>,
}

impl Default for CloudStorageConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            users: vec![],
        }
    }
}

impl CloudStorageConfig {
    /// Parse configuration from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CloudStorageError::Serialization(e.to_string()))
    }

    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Install a global `fmt` subscriber filtered by `filter`.
///
/// An empty filter defers to `RUST_LOG`. Fails if a global subscriber is
/// already set.
pub fn init_tracing(filter: &str) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let env_filter = if filter.is_empty() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::try_new(filter).map_err(|e| CloudStorageError::Config(e.to_string()))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .map_err(|e| CloudStorageError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CloudStorageConfig::default();
        assert_eq!(config.log_filter, "info");
        assert!(config.users.is_empty());
    }

    #[test]
    fn test_config_from_json() {
        let config = CloudStorageConfig::from_json(
            r#"{"users": [{"user_id": "alice", "capacity": 500}]}"#,
        )
        .unwrap();

        // Missing fields fall back to defaults
        assert_eq!(config.log_filter, "info");
        assert_eq!(
            config.users,
            vec![UserSeed {
                user_id: "alice".into(),
                capacity: 500
            }]
        );

        assert!(matches!(
            CloudStorageConfig::from_json("not json"),
            Err(CloudStorageError::Serialization(_))
        ));
    }

    #[test]
    fn test_load_config_and_seed_engine() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"log_filter": "debug", "users": [{{"user_id": "u1", "capacity": 100}}, {{"user_id": "u2", "capacity": 50}}]}}"#
        )
        .unwrap();

        let config = CloudStorageConfig::load(file.path()).unwrap();
        assert_eq!(config.log_filter, "debug");

        let mut engine = StorageEngine::from_config(&config).unwrap();
        assert!(engine.is_user("u1"));
        assert!(engine.is_user("u2"));
        assert_eq!(engine.add_file_by("u2", "/u2/a", 50), Some(0));
    }

    #[test]
    fn test_seeding_reserved_identity_fails() {
        let config = CloudStorageConfig {
            users: vec![UserSeed {
                user_id: ADMIN_ID.into(),
                capacity: 10,
            }],
            ..Default::default()
        };

        assert!(matches!(
            StorageEngine::from_config(&config),
            Err(CloudStorageError::Storage(StorageError::ReservedIdentity(_)))
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = CloudStorageConfig::load(dir.path().join("missing.json"));
        assert!(matches!(result, Err(CloudStorageError::Io(_))));
    }
}
