//! Configuration loading and management
//!
//! Handles parsing of `config.toml` and the environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::recurrence::{DEFAULT_OCCURRENCES, MAX_OCCURRENCES};
use crate::storage::{default_data_dir, JsonFileStore, Owner, TaskStore};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Whose tasks to work with
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Where tasks are kept
    #[serde(default)]
    pub storage: StorageConfig,

    /// Hosted task service settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Repeating task settings
    #[serde(default)]
    pub recurrence: RecurrenceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            storage: StorageConfig::default(),
            remote: RemoteConfig::default(),
            recurrence: RecurrenceConfig::default(),
        }
    }
}

fn default_owner() -> String {
    "local".to_string()
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Local,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: Backend,

    /// Data directory for the local backend
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// e.g. `http://localhost:3000`
    #[serde(default)]
    pub base_url: Option<String>,

    /// Value of the service's session cookie
    #[serde(default)]
    pub session_cookie: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            session_cookie: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceConfig {
    /// Occurrences created for a repeating task
    #[serde(default = "default_occurrences")]
    pub occurrences: usize,
}

fn default_occurrences() -> usize {
    DEFAULT_OCCURRENCES
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            occurrences: default_occurrences(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolves the config file and applies environment overrides.
    ///
    /// Lookup order: `explicit`, `$TODOCAL_CONFIG`, then
    /// `<config dir>/todocal/config.toml`. A missing file means defaults;
    /// a present but broken file is an error.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("TODOCAL_CONFIG").map(PathBuf::from))
            .or_else(|| dirs::config_dir().map(|d| d.join("todocal").join("config.toml")));

        let mut config = match path {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(&path)?
            }
            Some(path) if explicit.is_some() => {
                return Err(Error::InvalidConfig(format!(
                    "config file {} does not exist",
                    path.display()
                )))
            }
            _ => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(owner) = std::env::var("TODOCAL_OWNER") {
            if !owner.trim().is_empty() {
                self.owner = owner;
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        Owner::new(self.owner.clone())?;
        if self.recurrence.occurrences == 0 {
            return Err(Error::InvalidConfig(
                "recurrence.occurrences must be at least 1".into(),
            ));
        }
        if self.recurrence.occurrences > MAX_OCCURRENCES {
            return Err(Error::InvalidConfig(format!(
                "recurrence.occurrences must be at most {MAX_OCCURRENCES}"
            )));
        }
        if self.storage.backend == Backend::Remote
            && self.remote.base_url.as_deref().map_or(true, |u| u.trim().is_empty())
        {
            return Err(Error::InvalidConfig(
                "storage.backend = \"remote\" needs remote.base_url".into(),
            ));
        }
        Ok(())
    }

    pub fn owner(&self) -> Result<Owner> {
        Owner::new(self.owner.clone())
    }

    /// Local data directory: `storage.path`, else `TODOCAL_DB`, else the
    /// platform data dir.
    pub fn data_dir(&self) -> PathBuf {
        self.storage.path.clone().unwrap_or_else(default_data_dir)
    }

    /// Opens the configured backend.
    pub fn open_store(&self) -> Result<Box<dyn TaskStore>> {
        match self.storage.backend {
            Backend::Local => {
                let store = JsonFileStore::new(self.data_dir(), self.owner()?);
                tracing::debug!(path = %store.tasks_path().display(), "using local store");
                Ok(Box::new(store))
            }
            Backend::Remote => {
                tracing::debug!(url = ?self.remote.base_url, "using remote store");
                Ok(Box::new(crate::remote::RemoteStore::new(&self.remote)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_five_occurrences() {
        let config = Config::default();
        assert_eq!(config.owner, "local");
        assert_eq!(config.storage.backend, Backend::Local);
        assert_eq!(config.recurrence.occurrences, 5);
        assert_eq!(config.remote.timeout_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
owner = "mina"

[storage]
backend = "remote"

[remote]
base_url = "http://localhost:3000/"
session_cookie = "s%3Aabc"
timeout_secs = 3

[recurrence]
occurrences = 8
"#,
        )
        .expect("write config");

        let config = Config::load(&path).expect("load");
        assert_eq!(config.owner, "mina");
        assert_eq!(config.storage.backend, Backend::Remote);
        assert_eq!(config.remote.base_url.as_deref(), Some("http://localhost:3000/"));
        assert_eq!(config.remote.timeout_secs, 3);
        assert_eq!(config.recurrence.occurrences, 8);
    }

    #[test]
    fn validate_rejects_zero_occurrences_and_bare_remote() {
        let mut config = Config::default();
        config.recurrence.occurrences = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = Config::default();
        config.storage.backend = Backend::Remote;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn load_rejects_oversized_occurrences() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[recurrence]\noccurrences = 9223372036854775807\n").expect("write config");

        match Config::load(&path) {
            Err(Error::InvalidConfig(message)) => assert!(message.contains("at most 366")),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }

        let mut config = Config::default();
        config.recurrence.occurrences = MAX_OCCURRENCES;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn save_round_trips_through_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.storage.path = Some(dir.path().join("data"));
        config.save(&path).expect("save");

        let loaded = Config::load(&path).expect("load");
        assert_eq!(loaded.storage.path, config.storage.path);
        assert_eq!(loaded.recurrence.occurrences, 5);
    }
}
