//! Playlist summary cache
//!
//! Summaries are expensive (every playlist's items have to be enumerated), so
//! the last refresh is kept on disk and shown until the user refreshes again.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::plex::PlaylistSummary;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistCache {
    /// When the summaries were computed (RFC 3339)
    pub timestamp: String,
    pub playlists: Vec<PlaylistSummary>,
}

/// Two-list layout written by earlier releases
#[derive(Debug, Deserialize)]
struct LegacyCache {
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    music_playlist_data: Vec<PlaylistSummary>,
    #[serde(default)]
    video_playlist_data: Vec<PlaylistSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CacheFile {
    Current(PlaylistCache),
    Legacy(LegacyCache),
}

impl From<CacheFile> for PlaylistCache {
    fn from(file: CacheFile) -> Self {
        match file {
            CacheFile::Current(cache) => cache,
            CacheFile::Legacy(legacy) => Self {
                timestamp: legacy.timestamp,
                playlists: legacy
                    .music_playlist_data
                    .into_iter()
                    .chain(legacy.video_playlist_data)
                    .collect(),
            },
        }
    }
}

impl PlaylistCache {
    /// Snapshot taken now
    pub fn new(playlists: Vec<PlaylistSummary>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            playlists,
        }
    }

    /// Load the cache; absent or unreadable files give an empty cache
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!("No playlist cache at {}", path.display());
            return Self::default();
        }

        match Self::read(path) {
            Ok(cache) => {
                debug!("Loaded {} cached playlists", cache.playlists.len());
                cache
            }
            Err(e) => {
                warn!("Ignoring playlist cache {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read playlist cache from {:?}", path))?;
        let file: CacheFile =
            serde_json::from_str(&contents).context("Failed to parse playlist cache")?;
        Ok(file.into())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize playlist cache")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write playlist cache to {:?}", path))?;

        debug!("Saved {} playlists to cache", self.playlists.len());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty()
    }

    /// Date part of the timestamp, for display
    pub fn date(&self) -> &str {
        self.timestamp.split('T').next().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plex::PlaylistKind;

    fn summary(title: &str, kind: PlaylistKind) -> PlaylistSummary {
        PlaylistSummary {
            title: title.to_string(),
            kind,
            item_count: 3,
            display_size: "3.00 MB".to_string(),
            total_bytes: 3 * 1_048_576,
            summary: String::new(),
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("playlists.json");
        let cache = PlaylistCache::new(vec![
            summary("Mix", PlaylistKind::Music),
            summary("Films", PlaylistKind::Video),
        ]);
        cache.save(&path).unwrap();

        let loaded = PlaylistCache::load(&path);
        assert_eq!(loaded, cache);
        assert_eq!(loaded.date().len(), 10);
    }

    #[test]
    fn test_missing_and_malformed_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playlists.json");
        assert!(PlaylistCache::load(&path).is_empty());

        std::fs::write(&path, "[1, 2").unwrap();
        assert!(PlaylistCache::load(&path).is_empty());

        std::fs::write(&path, r#"{"playlists": "nope", "timestamp": "x"}"#).unwrap();
        assert!(PlaylistCache::load(&path).is_empty());
    }

    #[test]
    fn test_reads_legacy_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playlists_cache.json");
        std::fs::write(
            &path,
            r#"{
                "music_playlist_data": [
                    {"title": "Chill", "item_count": 12, "display_size": "80.00 MB",
                     "summary": "", "type": "Music"}
                ],
                "video_playlist_data": [
                    {"title": "Marathon", "item_count": 4, "display_size": "9.10 GB",
                     "summary": "", "type": "Video"}
                ],
                "timestamp": "2024-03-09T18:22:01.123456"
            }"#,
        )
        .unwrap();

        let cache = PlaylistCache::load(&path);
        assert_eq!(cache.date(), "2024-03-09");
        assert_eq!(cache.playlists.len(), 2);
        assert_eq!(cache.playlists[0].kind, PlaylistKind::Music);
        assert_eq!(cache.playlists[1].title, "Marathon");
        assert_eq!(cache.playlists[1].total_bytes, 0);
    }
}
