//! Application configuration and store factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use recall_core::engine::{EngineConfig, ReviewEngine};
use recall_core::memory::MemoryStore;
use recall_core::sweeper::SweeperConfig;
use recall_core::traits::{ItemStore, StatsStore};

use crate::sqlite::SqliteStore;

/// Where items, sessions and statistics live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    Sqlite {
        #[serde(default = "default_database")]
        path: PathBuf,
    },
    /// Nothing survives the process. Useful for trying things out.
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_database(),
        }
    }
}

fn default_database() -> PathBuf {
    PathBuf::from("recall.db")
}

/// Top-level recall configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    /// Items per session when none is requested.
    #[serde(default = "default_session_limit")]
    pub default_session_limit: usize,
    /// Idle sessions older than this are reclaimed.
    #[serde(default = "default_max_age_hours")]
    pub session_max_age_hours: u64,
    /// Seconds between background sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_session_limit() -> usize {
    10
}
fn default_max_age_hours() -> u64 {
    24
}
fn default_sweep_interval() -> u64 {
    3600
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            default_session_limit: default_session_limit(),
            session_max_age_hours: default_max_age_hours(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl RecallConfig {
    pub fn session_max_age(&self) -> chrono::Duration {
        let hours = i64::try_from(self.session_max_age_hours).unwrap_or(i64::MAX);
        chrono::Duration::try_hours(hours).unwrap_or(chrono::Duration::MAX)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            default_limit: self.default_session_limit,
            session_max_age: self.session_max_age(),
        }
    }

    pub fn sweeper_config(&self) -> SweeperConfig {
        SweeperConfig {
            interval: StdDuration::from_secs(self.sweep_interval_secs),
            max_age: self.session_max_age(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + len];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `recall.toml` in the current directory
/// 2. `~/.config/recall/config.toml`
///
/// Environment variable overrides: `RECALL_DATABASE`,
/// `RECALL_SESSION_MAX_AGE_HOURS`.
pub fn load_config() -> Result<RecallConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<RecallConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("recall.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<RecallConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => RecallConfig::default(),
    };

    // Apply env var overrides
    if let Ok(db) = std::env::var("RECALL_DATABASE") {
        config.storage = StorageConfig::Sqlite {
            path: PathBuf::from(db),
        };
    }
    if let Ok(hours) = std::env::var("RECALL_SESSION_MAX_AGE_HOURS") {
        config.session_max_age_hours = hours
            .trim()
            .parse()
            .with_context(|| format!("invalid RECALL_SESSION_MAX_AGE_HOURS: {hours}"))?;
    }

    if let StorageConfig::Sqlite { path: db } = &mut config.storage {
        let resolved = PathBuf::from(resolve_env_vars(&db.to_string_lossy()));
        // A relative database path is taken relative to the config file.
        *db = match config_path.as_deref().and_then(Path::parent) {
            Some(dir) if resolved.is_relative() && !dir.as_os_str().is_empty() => {
                dir.join(resolved)
            }
            _ => resolved,
        };
    }

    tracing::debug!(source = ?config_path, storage = ?config.storage, "loaded configuration");
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("recall"))
}

/// Open the configured store.
pub fn create_store(storage: &StorageConfig) -> Result<Store> {
    match storage {
        StorageConfig::Sqlite { path } => SqliteStore::open(path)
            .map(|s| Store::Sqlite(Arc::new(s)))
            .with_context(|| format!("failed to open database: {}", path.display())),
        StorageConfig::Memory => Ok(Store::Memory(Arc::new(MemoryStore::new()))),
    }
}

/// A concrete store chosen by configuration.
#[derive(Clone)]
pub enum Store {
    Sqlite(Arc<SqliteStore>),
    Memory(Arc<MemoryStore>),
}

impl Store {
    pub fn items(&self) -> Arc<dyn ItemStore> {
        match self {
            Store::Sqlite(s) => s.clone(),
            Store::Memory(s) => s.clone(),
        }
    }

    pub fn stats(&self) -> Arc<dyn StatsStore> {
        match self {
            Store::Sqlite(s) => s.clone(),
            Store::Memory(s) => s.clone(),
        }
    }

    /// Review engine sharing this store.
    pub fn engine(&self, config: EngineConfig) -> ReviewEngine {
        match self {
            Store::Sqlite(s) => ReviewEngine::with_store(Arc::clone(s), config),
            Store::Memory(s) => ReviewEngine::with_store(Arc::clone(s), config),
        }
    }
}
