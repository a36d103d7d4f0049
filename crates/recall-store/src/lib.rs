//! recall-store: SQLite storage backend and configuration for recall.

pub mod config;
pub mod sqlite;

pub use config::{create_store, load_config, load_config_from, RecallConfig, StorageConfig, Store};
pub use sqlite::SqliteStore;
