//! Application configuration
//!
//! Stored as JSON (`infokeep.json` by convention). A missing file means
//! defaults; `INFOKEEP_DB_PATH` and `INFOKEEP_LOG_LEVEL` override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{DomainError, DomainResult};
use crate::fetch::{DEFAULT_MAX_BYTES, DEFAULT_TIMEOUT};

pub const DB_PATH_ENV: &str = "INFOKEEP_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "INFOKEEP_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file, or ":memory:"
    pub db_path: PathBuf,
    /// trace, debug, info, warn or error
    pub log_level: String,
    pub session_ttl_hours: u64,
    pub fetch_timeout_secs: u64,
    pub fetch_max_bytes: usize,
    /// Look up preview images when bookmarks are created
    pub fetch_thumbnails: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("infokeep.db"),
            log_level: "info".to_string(),
            session_ttl_hours: 24 * 7,
            fetch_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            fetch_max_bytes: DEFAULT_MAX_BYTES,
            fetch_thumbnails: true,
        }
    }
}

impl AppConfig {
    /// Defaults with a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            db_path: PathBuf::from(":memory:"),
            ..Self::default()
        }
    }

    /// Read `path` if it exists, then apply environment overrides
    pub fn load(path: &Path) -> DomainResult<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| DomainError::Storage(format!("Failed to read {}: {}", path.display(), e)))?;
            serde_json::from_str(&raw)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> DomainResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| DomainError::Storage(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn apply_env(&mut self) {
        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            if !path.trim().is_empty() {
                self.db_path = PathBuf::from(path);
            }
        }
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            if !level.trim().is_empty() {
                self.log_level = level.trim().to_lowercase();
            }
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_hours * 3600)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.fetch_timeout(), Duration::from_secs(5));
        assert_eq!(config.fetch_max_bytes, 102_400);
        assert_eq!(config.session_ttl(), Duration::from_secs(7 * 24 * 3600));
    }

    #[test]
    fn test_save_and_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("infokeep.json");

        std::fs::write(&path, r#"{ "fetch_thumbnails": false, "session_ttl_hours": 1 }"#).unwrap();
        let loaded = AppConfig::load(&path).unwrap();
        assert!(!loaded.fetch_thumbnails);
        assert_eq!(loaded.session_ttl_hours, 1);
        assert_eq!(loaded.fetch_max_bytes, DEFAULT_MAX_BYTES);

        let mut config = AppConfig::in_memory();
        config.fetch_timeout_secs = 2;
        config.save(&path).unwrap();
        let reloaded: AppConfig = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(DomainError::Serialization(_))));
    }
}
