use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::api::http::DEFAULT_API_URL;
use crate::errors::PitwallError;
use crate::live::DEFAULT_POLL_INTERVAL_MS;

const CONFIG_FILE_NAME: &str = "config.json";
pub const APP_DIR_NAME: &str = "pitwall";
pub const API_URL_ENV: &str = "PITWALL_API_URL";
pub const DEFAULT_FEED_PAGE_SIZE: u32 = 20;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub poll_interval_ms: u64,
    pub feed_page_size: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            feed_page_size: DEFAULT_FEED_PAGE_SIZE,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Result<PathBuf, PitwallError> {
        Ok(dirs::config_dir()
            .ok_or(PitwallError::NoConfigDir)?
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME))
    }

    /// Reads `<config_dir>/pitwall/config.json`, `None` when there is no such file.
    pub fn from_local_file() -> Result<Option<Self>, PitwallError> {
        match dirs::config_dir() {
            Some(dir) => Self::from_path(&dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME)),
            None => Ok(None),
        }
    }

    pub fn from_path(config_path: &Path) -> Result<Option<Self>, PitwallError> {
        if !config_path.exists() {
            return Ok(None);
        }
        let file = File::open(config_path).map_err(|e| PitwallError::ConfigIOError { source: e })?;
        serde_json::from_reader(file)
            .map(Some)
            .map_err(|e| PitwallError::ConfigSerializeError { source: e })
    }

    pub fn save(&self) -> Result<(), PitwallError> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), PitwallError> {
        if let Some(parent) = config_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| PitwallError::ConfigIOError { source: e })?;
            }
        }

        let file =
            File::create(config_path).map_err(|e| PitwallError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| PitwallError::ConfigSerializeError { source: e })
    }

    /// Applies the API URL overrides, the command line wins over the environment.
    pub fn with_overrides(mut self, env_url: Option<String>, cli_url: Option<String>) -> Self {
        if let Some(url) = cli_url.or(env_url).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url;
        }
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn feed_page_size(&self) -> u32 {
        self.feed_page_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempdir().unwrap();
        assert_eq!(AppConfig::from_path(&dir.path().join("config.json")).unwrap(), None);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = AppConfig {
            api_base_url: "https://pitwall.example.com".to_string(),
            poll_interval_ms: 2000,
            feed_page_size: 10,
        };
        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::from_path(&path).unwrap(), Some(config));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"poll_interval_ms": 1000}"#).unwrap();
        let config = AppConfig::from_path(&path).unwrap().unwrap();
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.feed_page_size, DEFAULT_FEED_PAGE_SIZE);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            AppConfig::from_path(&path),
            Err(PitwallError::ConfigSerializeError { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let env = Some("http://env:8080".to_string());
        let cli = Some("http://cli:8080".to_string());

        let config = AppConfig::default().with_overrides(env.clone(), None);
        assert_eq!(config.api_base_url, "http://env:8080");

        let config = AppConfig::default().with_overrides(env, cli);
        assert_eq!(config.api_base_url, "http://cli:8080");

        let config = AppConfig::default().with_overrides(Some("  ".to_string()), None);
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let config = AppConfig {
            poll_interval_ms: 0,
            feed_page_size: 0,
            ..Default::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
        assert_eq!(config.feed_page_size(), 1);
    }
}
