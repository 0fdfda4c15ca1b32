//! Playlist summaries shown in listings and stored in the cache

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use super::session::{MediaItem, MediaKind, MediaServer, PlaylistHandle};
use crate::utils::format_size;

/// Built-in playlist holding the whole music library
pub const ALL_MUSIC_TITLE: &str = "All Music";

/// Concurrent item fetches while refreshing
const REFRESH_PARALLEL: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistKind {
    #[serde(alias = "Music")]
    Music,
    #[serde(alias = "Video")]
    Video,
    #[serde(alias = "Unknown")]
    Unknown,
    #[serde(alias = "Empty")]
    Empty,
}

impl PlaylistKind {
    /// Classify by the first item
    pub fn classify(items: &[MediaItem]) -> Self {
        match items.first().map(|i| &i.kind) {
            None => Self::Empty,
            Some(MediaKind::Track) => Self::Music,
            Some(kind) if kind.is_video() => Self::Video,
            Some(_) => Self::Unknown,
        }
    }
}

impl fmt::Display for PlaylistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Music => "Music",
            Self::Video => "Video",
            Self::Unknown => "Unknown",
            Self::Empty => "Empty",
        };
        f.write_str(s)
    }
}

/// What a playlist holds, computed by enumerating its items once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: PlaylistKind,
    pub item_count: usize,
    pub display_size: String,
    #[serde(default)]
    pub total_bytes: u64,
    #[serde(default)]
    pub summary: String,
}

impl PlaylistSummary {
    pub fn from_items(playlist: &PlaylistHandle, items: &[MediaItem]) -> Self {
        let total_bytes: u64 = items.iter().map(MediaItem::total_size).sum();
        Self {
            title: playlist.title.clone(),
            kind: PlaylistKind::classify(items),
            item_count: items.len(),
            display_size: format_size(total_bytes),
            total_bytes,
            summary: playlist.summary.clone(),
        }
    }
}

/// Summarize every playlist on the server except the built-in library playlist
///
/// Playlists whose items cannot be fetched are logged and left out.
pub async fn collect_summaries<S: MediaServer>(server: &S) -> anyhow::Result<Vec<PlaylistSummary>> {
    let playlists: Vec<PlaylistHandle> = server
        .playlists()
        .await?
        .into_iter()
        .filter(|p| p.title != ALL_MUSIC_TITLE)
        .collect();

    debug!("Summarizing {} playlists", playlists.len());

    let summaries: Vec<PlaylistSummary> = stream::iter(playlists)
        .map(|playlist| async move {
            match server.playlist_items(&playlist).await {
                Ok(items) => Some(PlaylistSummary::from_items(&playlist, &items)),
                Err(e) => {
                    warn!("Skipping playlist '{}': {:#}", playlist.title, e);
                    None
                }
            }
        })
        .buffered(REFRESH_PARALLEL)
        .filter_map(|s| async move { s })
        .collect()
        .await;

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plex::MediaPart;

    fn item(kind: MediaKind, sizes: &[Option<u64>]) -> MediaItem {
        MediaItem {
            rating_key: "1".to_string(),
            kind,
            title: "t".to_string(),
            parent_title: None,
            grandparent_title: None,
            original_title: None,
            index: None,
            parent_index: None,
            year: None,
            container: None,
            parts: sizes
                .iter()
                .map(|size| MediaPart { key: "/p".to_string(), size: *size, file: None })
                .collect(),
        }
    }

    fn handle(title: &str) -> PlaylistHandle {
        PlaylistHandle {
            rating_key: "9".to_string(),
            title: title.to_string(),
            playlist_type: "audio".to_string(),
            leaf_count: 2,
            summary: "weekend".to_string(),
            smart: false,
        }
    }

    #[test]
    fn test_summary_of_music_playlist() {
        let items = vec![
            item(MediaKind::Track, &[Some(1_048_576)]),
            item(MediaKind::Track, &[Some(5 * 1_048_576), None]),
        ];
        let summary = PlaylistSummary::from_items(&handle("Mix"), &items);
        assert_eq!(summary.kind, PlaylistKind::Music);
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.total_bytes, 6 * 1_048_576);
        assert_eq!(summary.display_size, "6.00 MB");
        assert_eq!(summary.summary, "weekend");
    }

    #[test]
    fn test_classification() {
        assert_eq!(PlaylistKind::classify(&[]), PlaylistKind::Empty);
        assert_eq!(PlaylistKind::classify(&[item(MediaKind::Movie, &[])]), PlaylistKind::Video);
        assert_eq!(
            PlaylistKind::classify(&[item(MediaKind::Other("photo".to_string()), &[])]),
            PlaylistKind::Unknown
        );
        let empty = PlaylistSummary::from_items(&handle("Nothing"), &[]);
        assert_eq!(empty.display_size, "0 B");
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let summary = PlaylistSummary::from_items(&handle("Mix"), &[item(MediaKind::Track, &[])]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["type"], "music");
    }

    #[tokio::test]
    async fn test_refresh_skips_library_and_broken_playlists() {
        use crate::download::testing::{FakeServer, playlist};

        let server = FakeServer::new()
            .with_items(&playlist("1", ALL_MUSIC_TITLE), vec![item(MediaKind::Track, &[Some(1)])])
            .with_items(&playlist("2", "Road Trip"), vec![item(MediaKind::Track, &[Some(2048)])])
            .with_broken(&playlist("3", "Broken"))
            .with_items(&playlist("4", "Empty"), Vec::new());

        let summaries = collect_summaries(&server).await.unwrap();
        let titles: Vec<&str> = summaries.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Road Trip", "Empty"]);
        assert_eq!(summaries[0].display_size, "2.00 KB");
        assert_eq!(summaries[1].kind, PlaylistKind::Empty);
    }
}
