//! Server session abstraction
//!
//! The downloader talks to a media server only through [`MediaServer`]. Values
//! crossing this boundary are fully typed: optional metadata is `Option`,
//! decided once when the server payload is converted.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::download::TransferSource;

/// Kind of a playlist entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Track,
    Episode,
    Movie,
    Other(String),
}

impl MediaKind {
    /// Parse the server's `type` field
    pub fn parse(value: &str) -> Self {
        match value {
            "track" => Self::Track,
            "episode" => Self::Episode,
            "movie" => Self::Movie,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Episode | Self::Movie)
    }
}

/// One physical file backing an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPart {
    /// Server-relative locator (`/library/parts/...`)
    pub key: String,
    /// Size in bytes, when the server reports it
    pub size: Option<u64>,
    /// Path of the file on the server's filesystem
    pub file: Option<String>,
}

/// Read-only snapshot of one downloadable playlist entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Stable server identifier
    pub rating_key: String,
    pub kind: MediaKind,
    pub title: String,
    /// Album (tracks) or season (episodes)
    pub parent_title: Option<String>,
    /// Artist (tracks) or show (episodes)
    pub grandparent_title: Option<String>,
    /// Track artist when it differs from the album artist
    pub original_title: Option<String>,
    /// Track or episode number
    pub index: Option<u32>,
    /// Season number
    pub parent_index: Option<u32>,
    pub year: Option<u32>,
    /// Container of the first media version (`mp3`, `mkv`, ...)
    pub container: Option<String>,
    pub parts: Vec<MediaPart>,
}

impl MediaItem {
    /// The part that gets downloaded (`media[0].parts[0]`)
    pub fn primary_part(&self) -> Option<&MediaPart> {
        self.parts.first()
    }

    /// Sum of every part's reported size
    pub fn total_size(&self) -> u64 {
        self.parts.iter().filter_map(|p| p.size).sum()
    }
}

/// A playlist as listed by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistHandle {
    pub rating_key: String,
    pub title: String,
    /// `audio`, `video`, `photo`, or empty when unknown
    pub playlist_type: String,
    /// Item count reported by the server listing; may be stale
    pub leaf_count: u32,
    pub summary: String,
    pub smart: bool,
}

/// An authenticated connection to a media server
#[async_trait]
pub trait MediaServer: Send + Sync {
    /// List every playlist on the server
    async fn playlists(&self) -> Result<Vec<PlaylistHandle>>;

    /// Fetch the current items of a playlist, in server order
    async fn playlist_items(&self, playlist: &PlaylistHandle) -> Result<Vec<MediaItem>>;

    /// Where the bytes of a part can be read from
    fn source_for(&self, part: &MediaPart) -> TransferSource;

    /// Re-resolve a playlist by title
    async fn find_playlist(&self, title: &str) -> Result<PlaylistHandle> {
        self.playlists()
            .await?
            .into_iter()
            .find(|p| p.title == title)
            .ok_or_else(|| anyhow::anyhow!("Playlist '{}' not found on server", title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_media_kind() {
        assert_eq!(MediaKind::parse("track"), MediaKind::Track);
        assert_eq!(MediaKind::parse("movie"), MediaKind::Movie);
        assert_eq!(MediaKind::parse("photo"), MediaKind::Other("photo".to_string()));
        assert!(MediaKind::Episode.is_video());
        assert!(!MediaKind::Track.is_video());
    }

    #[test]
    fn test_total_size_ignores_unknown_sizes() {
        let item = MediaItem {
            rating_key: "1".to_string(),
            kind: MediaKind::Movie,
            title: "Film".to_string(),
            parent_title: None,
            grandparent_title: None,
            original_title: None,
            index: None,
            parent_index: None,
            year: None,
            container: None,
            parts: vec![
                MediaPart { key: "/a".to_string(), size: Some(10), file: None },
                MediaPart { key: "/b".to_string(), size: None, file: None },
                MediaPart { key: "/c".to_string(), size: Some(5), file: None },
            ],
        };
        assert_eq!(item.total_size(), 15);
        assert_eq!(item.primary_part().map(|p| p.key.as_str()), Some("/a"));
    }
}
