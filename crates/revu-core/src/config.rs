//! Configuration management for revu.
//!
//! Loads configuration from ${REVU_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, edit default_config.toml directly.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for revu configuration and data directories.
    //!
    //! REVU_HOME resolution order:
    //! 1. REVU_HOME environment variable (if set)
    //! 2. ~/.config/revu (default)

    use std::path::PathBuf;

    /// Returns the revu home directory.
    ///
    /// Checks REVU_HOME env var first, falls back to ~/.config/revu
    pub fn revu_home() -> PathBuf {
        if let Ok(home) = std::env::var("REVU_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("revu"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        revu_home().join("config.toml")
    }

    /// Returns the directory for rolling log files.
    pub fn logs_dir() -> PathBuf {
        revu_home().join("logs")
    }
}

/// Realtime store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the realtime JSON store.
    pub base_url: String,
    /// Collection path holding the reviews.
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "https://revu-wall-default-rtdb.firebaseio.com".to_string(),
            collection: "reviews".to_string(),
        }
    }
}

/// Identity provider settings (OAuth authorization-code + PKCE).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth client id (public identifier, not a secret).
    pub client_id: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    /// Space-separated scope list.
    pub scopes: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: "681255809395-revuwall.apps.googleusercontent.com".to_string(),
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
            scopes: "openid profile".to_string(),
        }
    }
}

/// Bot-verification challenge service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptchaConfig {
    pub base_url: String,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://captcha.revu.dev".to_string(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log filter for the file log (overridden by REVU_LOG).
    pub log_filter: String,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub captcha: CaptchaConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            store: StoreConfig::default(),
            auth: AuthConfig::default(),
            captcha: CaptchaConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    /// Config loading: missing file returns defaults.
    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.store.collection, "reviews");
        assert_eq!(config.log_filter, "info");
    }

    /// Config loading: partial config merges with defaults.
    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            "[store]\nbase_url = \"https://wall.example.com\"\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.store.base_url, "https://wall.example.com");
        assert_eq!(config.store.collection, "reviews"); // default preserved
        assert_eq!(config.auth.scopes, "openid profile");
    }

    /// Config init: creates file with template, creates parent dirs.
    #[test]
    fn test_init_creates_config_with_template() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        assert!(config_path.exists());
        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# Revu Configuration"));
        assert!(contents.contains("collection = \"reviews\""));
    }

    /// Config init: fails if file exists (no silent overwrite).
    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        let result = Config::init(&config_path);
        assert!(result.is_err());
    }

    /// The embedded template parses back into the default config.
    #[test]
    fn test_template_matches_defaults() {
        let from_template: Config = toml::from_str(default_config_template()).unwrap();
        let defaults = Config::default();
        assert_eq!(from_template.store.base_url, defaults.store.base_url);
        assert_eq!(from_template.auth.client_id, defaults.auth.client_id);
        assert_eq!(from_template.captcha.base_url, defaults.captcha.base_url);
        assert_eq!(from_template.log_filter, defaults.log_filter);
    }
}
