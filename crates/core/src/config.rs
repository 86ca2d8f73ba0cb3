//! Application configuration.
//!
//! Layering, lowest to highest priority: built-in defaults, the optional
//! `~/.config/kisan/config.toml`, `KISAN_*` environment variables, and
//! finally the `API_BASE_URL` / `CLOUD_MEDIA_URL` names used by `.env` files.

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::{debug, warn};

/// Directory under the platform config/data roots.
pub const APP_DIR: &str = "kisan";
/// Backend used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
const DEFAULT_TIMEOUT_SECS: i64 = 30;

const DEFAULT_CONFIG: &str = r#"# Kisan client configuration.
# Every value can also be set through KISAN_<NAME> environment variables.

# Base URL of the backend API.
api_base_url = "http://localhost:5000/api"

# Prefix for crop images stored as relative paths.
# cloud_media_url = "https://res.cloudinary.com/<cloud>/image/upload"

# Seconds before an API request is abandoned.
request_timeout_secs = 30
"#;

/// Resolved runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Base URL every endpoint path is appended to.
    pub api_base_url: String,
    /// Prefix for relative crop image paths.
    #[serde(default)]
    pub cloud_media_url: Option<String>,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Where the session file lives.
    pub data_dir: PathBuf,
}

impl AppConfig {
    /// Load `.env`, then resolve the layered configuration from the default path.
    pub fn load() -> Result<Self> {
        load_dotenv();
        Self::load_from(&config_path())
    }

    /// Resolve configuration using `path` as the config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let default_data_dir = default_data_dir().to_string_lossy().to_string();
        let config = Config::builder()
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("request_timeout_secs", DEFAULT_TIMEOUT_SECS)?
            .set_default("data_dir", default_data_dir)?
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("KISAN").try_parsing(true))
            .set_override_option("api_base_url", env::var("API_BASE_URL").ok())?
            .set_override_option("cloud_media_url", env::var("CLOUD_MEDIA_URL").ok())?
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;

        let mut resolved: AppConfig = config
            .try_deserialize()
            .context("invalid configuration values")?;
        resolved.cloud_media_url = resolved
            .cloud_media_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        debug!(api_base_url = %resolved.api_base_url, "configuration loaded");
        Ok(resolved)
    }

    /// Per-request timeout, never below one second.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// File backing the persisted session.
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    /// Absolute URL for a crop image; relative paths are joined onto the media prefix.
    pub fn media_url(&self, image: &str) -> String {
        let image = image.trim();
        if image.starts_with("http://") || image.starts_with("https://") {
            return image.to_string();
        }
        match self.cloud_media_url.as_deref() {
            Some(prefix) => format!(
                "{}/{}",
                prefix.trim_end_matches('/'),
                image.trim_start_matches('/')
            ),
            None => image.to_string(),
        }
    }
}

/// Location of the user config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Write a commented default config file if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(&config_path())
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))
}

fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded environment file"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(%err, "failed to load environment file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "request_timeout_secs = 7\ndata_dir = \"/tmp/kisan-test\"\ncloud_media_url = \"  \"\n",
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.request_timeout(), Duration::from_secs(7));
        assert_eq!(config.session_path(), PathBuf::from("/tmp/kisan-test/session.json"));
        Ok(())
    }

    #[test]
    fn default_config_is_written_once_and_parses() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("kisan/config.toml");
        write_default_config(&path)?;
        fs::write(&path, format!("{DEFAULT_CONFIG}\n# edited\n"))?;
        write_default_config(&path)?;
        assert!(fs::read_to_string(&path)?.ends_with("# edited\n"));

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.request_timeout_secs, 30);
        Ok(())
    }

    #[test]
    fn media_urls_join_relative_paths() {
        let config = AppConfig {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            cloud_media_url: Some("https://cdn.example.com/upload/".to_string()),
            request_timeout_secs: 30,
            data_dir: PathBuf::from("."),
        };
        assert_eq!(
            config.media_url("/crops/a.jpg"),
            "https://cdn.example.com/upload/crops/a.jpg"
        );
        assert_eq!(
            config.media_url("https://other.example.com/b.jpg"),
            "https://other.example.com/b.jpg"
        );
    }
}
