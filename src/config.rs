//! Configuration loading and management
//!
//! Handles parsing of `.ip.toml` configuration files. The config lives next
//! to the planner document (or wherever `--config` points); tracker
//! credentials never sit in the file, the password comes from the
//! `IP_PASSWORD` environment variable.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the tracker password or app token
pub const PASSWORD_ENV: &str = "IP_PASSWORD";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tracker authentication
    #[serde(default)]
    pub auth: AuthConfig,

    /// Bitbucket API endpoint settings
    #[serde(default)]
    pub bitbucket: BitbucketConfig,

    /// Sync behavior
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth: AuthConfig::default(),
            bitbucket: BitbucketConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

/// Tracker authentication configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Username for the tracker API; anonymous access when empty
    #[serde(default)]
    pub username: Option<String>,
}

impl AuthConfig {
    /// Username/password pair for API requests
    ///
    /// The password is read from `IP_PASSWORD` so it never lands in a
    /// config file committed next to the document.
    pub fn credentials(&self) -> (Option<String>, Option<String>) {
        let username = self
            .username
            .as_ref()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let password = std::env::var(PASSWORD_ENV).ok().filter(|value| !value.is_empty());
        (username, password)
    }
}

/// Bitbucket API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketConfig {
    /// Base URL of the issue API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Issues fetched per pagination request
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
}

fn default_base_url() -> String {
    "https://api.bitbucket.org/1.0".to_string()
}

fn default_batch_size() -> u64 {
    25
}

impl Default for BitbucketConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            batch_size: default_batch_size(),
        }
    }
}

/// Sync behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How long to wait for the document lock, in milliseconds
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    crate::lock::DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from an `.ip.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config for a document path and optional explicit config
    /// file
    ///
    /// An `.ip.toml` that exists but fails to parse or validate is an
    /// error, never silently replaced with defaults.
    pub fn resolve(
        document: &Path,
        explicit: Option<&PathBuf>,
    ) -> crate::error::Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let dir = document.parent().unwrap_or_else(|| Path::new("."));
        let config_path = dir.join(".ip.toml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.bitbucket.base_url.trim().is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "bitbucket.base_url cannot be empty".to_string(),
            ));
        }
        if self.bitbucket.batch_size == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "bitbucket.batch_size must be > 0".to_string(),
            ));
        }
        if self.bitbucket.batch_size > 100 {
            return Err(crate::error::Error::InvalidConfig(
                "bitbucket.batch_size must be <= 100".to_string(),
            ));
        }
        if self.sync.lock_timeout_ms == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "sync.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_expected() {
        let cfg = Config::default();
        assert!(cfg.auth.username.is_none());
        assert_eq!(cfg.bitbucket.base_url, "https://api.bitbucket.org/1.0");
        assert_eq!(cfg.bitbucket.batch_size, 25);
        assert_eq!(cfg.sync.lock_timeout_ms, 5000);
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".ip.toml");
        let content = r#"
[auth]
username = "reece"

[bitbucket]
base_url = "https://bb.internal.example/api/1.0"
batch_size = 50

[sync]
lock_timeout_ms = 10000
"#;
        fs::write(&path, content.trim()).expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(cfg.auth.username.as_deref(), Some("reece"));
        assert_eq!(cfg.bitbucket.base_url, "https://bb.internal.example/api/1.0");
        assert_eq!(cfg.bitbucket.batch_size, 50);
        assert_eq!(cfg.sync.lock_timeout_ms, 10000);
    }

    #[test]
    fn invalid_batch_size_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".ip.toml");
        fs::write(&path, "[bitbucket]\nbatch_size = 0\n").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        match err {
            crate::error::Error::InvalidConfig(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn resolve_defaults_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let document = dir.path().join("project.planner");
        let cfg = Config::resolve(&document, None).expect("resolve");
        assert_eq!(cfg.bitbucket.batch_size, 25);
    }

    #[test]
    fn resolve_reads_file_next_to_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".ip.toml");
        fs::write(&path, "[bitbucket]\nbatch_size = 10\n").expect("write config");

        let document = dir.path().join("project.planner");
        let cfg = Config::resolve(&document, None).expect("resolve");
        assert_eq!(cfg.bitbucket.batch_size, 10);
    }

    #[test]
    fn resolve_propagates_broken_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".ip.toml");
        fs::write(&path, "[bitbucket]\nbatch_size = 0\n").expect("write config");

        let document = dir.path().join("project.planner");
        let err = Config::resolve(&document, None).expect_err("broken config");
        match err {
            crate::error::Error::InvalidConfig(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn save_writes_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.toml");
        let cfg = Config::default();
        cfg.save(&path).expect("save config");

        let written = fs::read_to_string(&path).expect("read config");
        assert!(written.contains("base_url"));
    }
}
