//! On-disk state: configuration and the playlist cache

mod cache;
mod config;

pub use cache::PlaylistCache;
pub use config::Config;

use anyhow::Result;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "plexpull";

/// Where configuration, cache and log files live
#[derive(Debug, Clone)]
pub struct StorePaths {
    config_dir: PathBuf,
    cache_dir: PathBuf,
}

impl StorePaths {
    /// Platform directories, or a single directory for everything when overridden
    pub fn resolve(override_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = override_dir {
            return Ok(Self {
                config_dir: dir.clone(),
                cache_dir: dir,
            });
        }

        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join(APP_DIR);
        let cache_dir = dirs::cache_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| config_dir.clone());

        Ok(Self {
            config_dir,
            cache_dir,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    pub fn cache_file(&self) -> PathBuf {
        self.cache_dir.join("playlists.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.config_dir.join("plexpull.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_puts_everything_in_one_dir() {
        let paths = StorePaths::resolve(Some(PathBuf::from("/tmp/pp"))).unwrap();
        assert_eq!(paths.config_file(), Path::new("/tmp/pp/config.json"));
        assert_eq!(paths.cache_file(), Path::new("/tmp/pp/playlists.json"));
        assert_eq!(paths.log_file(), Path::new("/tmp/pp/plexpull.log"));
    }
}
