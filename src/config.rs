//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. explicit path (the CLI's `--config`)
//! 2. `~/.muninn/config.toml` (user)
//! 3. `/etc/muninn/config.toml` (system)
//!
//! ```toml
//! [transport]
//! base_url = "http://localhost:8080"
//! timeout_secs = 30
//!
//! [cache]
//! refresh_interval_ms = 1000
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::{MuninnError, Result};

/// Client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub cache: CacheSection,
}

/// Transport settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// API root (default: http://localhost:8080).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// Period between automatic refreshes in milliseconds (default: 1000).
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

fn default_refresh_interval_ms() -> u64 {
    1000
}

impl Config {
    /// Load configuration from the first file found in the resolution order.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        let content = fs::read_to_string(&path).map_err(|e| {
            MuninnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml_str(&content).map_err(|e| {
            MuninnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MuninnError::Configuration(e.to_string()))
    }

    /// Cache configuration derived from the `[cache]` section.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new().refresh_interval(Duration::from_millis(self.cache.refresh_interval_ms))
    }

    /// Files consulted when no explicit path is given, highest priority
    /// first.
    pub fn search_paths() -> Vec<PathBuf> {
        let user = dirs::home_dir().map(|home| home.join(".muninn").join(CONFIG_FILE));
        let system = Path::new(SYSTEM_DIR).join(CONFIG_FILE);
        user.into_iter().chain([system]).collect()
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) if path.is_file() => Ok(path.to_path_buf()),
            Some(path) => Err(MuninnError::Configuration(format!(
                "Config file not found: {}",
                path.display()
            ))),
            None => first_existing(&Self::search_paths()),
        }
    }
}

const CONFIG_FILE: &str = "config.toml";
const SYSTEM_DIR: &str = "/etc/muninn";

fn first_existing(candidates: &[PathBuf]) -> Result<PathBuf> {
    candidates
        .iter()
        .find(|candidate| candidate.is_file())
        .cloned()
        .ok_or_else(|| {
            let tried: Vec<String> = candidates.iter().map(|c| c.display().to_string()).collect();
            MuninnError::Configuration(format!("No config file found (tried {})", tried.join(", ")))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.transport.base_url, "http://localhost:8080");
        assert_eq!(config.transport.timeout(), Duration::from_secs(30));
        assert_eq!(config.cache.refresh_interval_ms, 1000);
        assert_eq!(
            config.cache_config().refresh_interval,
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::from_toml_str(
            r#"
            [transport]
            base_url = "http://library:9000"
            timeout_secs = 5

            [cache]
            refresh_interval_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.transport.base_url, "http://library:9000");
        assert_eq!(config.transport.timeout_secs, 5);
        assert_eq!(
            config.cache_config().refresh_interval,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn invalid_toml_rejected() {
        let err = Config::from_toml_str("[cache\nrefresh_interval_ms = ").unwrap_err();
        assert!(matches!(err, MuninnError::Configuration(_)));
    }

    #[test]
    fn load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache]\nrefresh_interval_ms = 5000\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.cache.refresh_interval_ms, 5000);
    }

    #[test]
    fn search_paths_prefer_user_over_system() {
        let paths = Config::search_paths();
        assert_eq!(paths.last(), Some(&PathBuf::from("/etc/muninn/config.toml")));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(paths[0], home.join(".muninn/config.toml"));
            assert_eq!(paths.len(), 2);
        }
    }

    #[test]
    fn first_existing_candidate_wins() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let present = dir.path().join("present.toml");
        let later = dir.path().join("later.toml");
        fs::write(&present, "").unwrap();
        fs::write(&later, "").unwrap();

        let found = first_existing(&[missing.clone(), present.clone(), later]).unwrap();
        assert_eq!(found, present);

        let err = first_existing(&[missing]).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }

    #[test]
    fn directory_is_not_a_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(dir.path())).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn load_missing_explicit_path_fails() {
        let err = Config::load(Some(Path::new("/nonexistent/muninn.toml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }
}
