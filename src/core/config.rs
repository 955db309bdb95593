//! Configuration management with layered hierarchy

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::core::lexicon::{SchemaProfile, UniquenessScope};
use crate::core::sync::DEFAULT_SYNC_INTERVAL;

/// Local config location, relative to the working directory
pub const LOCAL_CONFIG: &str = ".emakhua/config.yaml";

/// Which store variant the command line talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    /// Single-page store: hard deletes, new entries unverified
    #[default]
    Full,
    /// Shared store: soft deletes, new entries verified
    Shared,
}

impl std::str::FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" | "standard" => Ok(ProfileKind::Full),
            "shared" => Ok(ProfileKind::Shared),
            other => Err(format!("unknown profile '{}' (expected full or shared)", other)),
        }
    }
}

/// Emakhua configuration with layered hierarchy
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the file-backed storage slots
    pub storage_dir: Option<PathBuf>,

    /// Store variant
    pub profile: Option<ProfileKind>,

    /// Headword uniqueness scope for newly created stores
    pub uniqueness: Option<UniquenessScope>,

    /// Sync monitor polling interval
    pub sync_interval_secs: Option<u64>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (accessors)

        // 2. Global user config (~/.config/emakhua/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Local config (./.emakhua/config.yaml)
        if let Some(local) = Self::read_file(Path::new(LOCAL_CONFIG)) {
            config.merge(local);
        }

        // 4. Environment variables
        config.apply_env(|key| std::env::var(key).ok());

        config
    }

    /// Parse a config file; missing or invalid files are skipped
    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config file");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "emakhua")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Override from `EMAKHUA_*` variables, looked up through `get`
    pub fn apply_env<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = get("EMAKHUA_STORAGE_DIR").filter(|s| !s.is_empty()) {
            self.storage_dir = Some(PathBuf::from(dir));
        }
        if let Some(profile) = get("EMAKHUA_PROFILE").and_then(|s| s.parse().ok()) {
            self.profile = Some(profile);
        }
        if let Some(secs) = get("EMAKHUA_SYNC_INTERVAL").and_then(|s| s.trim().parse().ok()) {
            self.sync_interval_secs = Some(secs);
        }
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.storage_dir.is_some() {
            self.storage_dir = other.storage_dir;
        }
        if other.profile.is_some() {
            self.profile = other.profile;
        }
        if other.uniqueness.is_some() {
            self.uniqueness = other.uniqueness;
        }
        if other.sync_interval_secs.is_some() {
            self.sync_interval_secs = other.sync_interval_secs;
        }
    }

    /// Storage directory, defaulting to the user data directory
    pub fn storage_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.storage_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("", "", "emakhua")
            .map(|dirs| dirs.data_dir().join("storage"))
            .unwrap_or_else(|| PathBuf::from(".emakhua/storage"))
    }

    pub fn profile(&self) -> ProfileKind {
        self.profile.unwrap_or_default()
    }

    pub fn sync_interval(&self) -> Duration {
        self.sync_interval_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SYNC_INTERVAL)
    }

    /// Schema profile for the configured store variant
    pub fn schema_profile(&self) -> SchemaProfile {
        let profile = match self.profile() {
            ProfileKind::Full => SchemaProfile::standard(),
            ProfileKind::Shared => SchemaProfile::shared(),
        };
        match self.uniqueness {
            Some(scope) => profile.with_uniqueness(scope),
            None => profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.profile(), ProfileKind::Full);
        assert_eq!(config.sync_interval(), DEFAULT_SYNC_INTERVAL);
        assert_eq!(config.schema_profile(), SchemaProfile::standard());
    }

    #[test]
    fn test_yaml_and_merge_precedence() {
        let mut config: Config = serde_yml::from_str(
            "storage_dir: /tmp/global\nprofile: shared\nsync_interval_secs: 9\n",
        )
        .unwrap();
        let local: Config = serde_yml::from_str("storage_dir: /tmp/local\nuniqueness: dialect\n").unwrap();
        config.merge(local);

        assert_eq!(config.storage_dir(), PathBuf::from("/tmp/local"));
        assert_eq!(config.profile(), ProfileKind::Shared);
        assert_eq!(config.sync_interval(), Duration::from_secs(9));

        let profile = config.schema_profile();
        assert_eq!(profile.uniqueness, UniquenessScope::PerDialect);
        assert_eq!(profile.storage_key, SchemaProfile::shared().storage_key);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("EMAKHUA_STORAGE_DIR", "/srv/emakhua"),
            ("EMAKHUA_PROFILE", "SHARED"),
            ("EMAKHUA_SYNC_INTERVAL", "not a number"),
        ]
        .into_iter()
        .collect();

        let mut config = Config {
            sync_interval_secs: Some(3),
            ..Default::default()
        };
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.storage_dir(), PathBuf::from("/srv/emakhua"));
        assert_eq!(config.profile(), ProfileKind::Shared);
        assert_eq!(config.sync_interval(), Duration::from_secs(3));
    }

    #[test]
    fn test_zero_interval_falls_back() {
        let config = Config {
            sync_interval_secs: Some(0),
            ..Default::default()
        };
        assert_eq!(config.sync_interval(), DEFAULT_SYNC_INTERVAL);
    }
}
