//! Configuration persistence
//!
//! A single JSON document holding the server address, token, download
//! directory, client identifier and transfer mode. A missing or unreadable
//! file never stops the tool: defaults are used and a warning is logged.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::plex::TransferMode;
use crate::plex::auth::generate_client_identifier;

pub const DEFAULT_ADDRESS: &str = "http://localhost:32400";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub plex_address: String,
    pub plex_token: String,
    pub download_directory: PathBuf,
    /// Stable identifier announced to the server as this client
    pub client_identifier: String,
    pub transfer_mode: TransferMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plex_address: DEFAULT_ADDRESS.to_string(),
            plex_token: String::new(),
            download_directory: default_download_directory(),
            client_identifier: generate_client_identifier(),
            transfer_mode: TransferMode::default(),
        }
    }
}

impl Config {
    /// Load the config, falling back to defaults on any problem
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::read(path) {
            Ok(mut config) => {
                if config.client_identifier.trim().is_empty() {
                    config.client_identifier = generate_client_identifier();
                }
                debug!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        serde_json::from_str(&contents).context("Failed to parse config")
    }

    /// Write the whole config, creating the parent directory
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// A token has been stored
    pub fn has_token(&self) -> bool {
        !self.plex_token.trim().is_empty()
    }
}

fn default_download_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Downloads")
        .join("PlexPlaylists")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.json"));
        assert_eq!(config.plex_address, DEFAULT_ADDRESS);
        assert!(!config.has_token());
        assert_eq!(config.client_identifier.len(), 24);
        assert!(config.download_directory.ends_with("Downloads/PlexPlaylists"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            plex_address: "http://nas:32400".to_string(),
            plex_token: "secret".to_string(),
            download_directory: PathBuf::from("/media/plex"),
            client_identifier: "abc".to_string(),
            transfer_mode: TransferMode::Http,
        };
        config.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"transfer_mode\": \"http\""));
        assert_eq!(Config::load(&path), config);
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load(&path).plex_address, DEFAULT_ADDRESS);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"plex_token": "t", "client_identifier": ""}"#).unwrap();

        let config = Config::load(&path);
        assert_eq!(config.plex_token, "t");
        assert_eq!(config.plex_address, DEFAULT_ADDRESS);
        assert_eq!(config.transfer_mode, TransferMode::Auto);
        assert_eq!(config.client_identifier.len(), 24);
    }
}
