//! Plex API response models
//!
//! Only the fields the downloader needs are modelled; everything else in the
//! server's JSON is ignored. Conversion into the session types happens here so
//! the rest of the crate never sees a loosely-typed payload.

use serde::Deserialize;

use super::session::{MediaItem, MediaKind, MediaPart, PlaylistHandle};

/// Wrapper for all Plex JSON responses
#[derive(Debug, Clone, Deserialize)]
pub struct PlexResponse<T> {
    #[serde(rename = "MediaContainer")]
    pub media_container: T,
}

/// Server identity (`GET /`)
#[derive(Debug, Clone, Deserialize)]
pub struct ServerIdentity {
    #[serde(rename = "friendlyName")]
    pub friendly_name: Option<String>,
    pub version: Option<String>,
}

/// Container holding a list of metadata entries
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct MetadataContainer<T> {
    pub size: Option<u32>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<T>,
}

/// Playlist metadata (`GET /playlists`)
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistMetadata {
    #[serde(rename = "ratingKey")]
    pub rating_key: String,
    pub title: String,
    #[serde(rename = "playlistType")]
    pub playlist_type: Option<String>,
    #[serde(rename = "leafCount")]
    pub leaf_count: Option<u32>,
    pub summary: Option<String>,
    pub smart: Option<bool>,
}

/// Playlist entry (`GET /playlists/{ratingKey}/items`)
#[derive(Debug, Clone, Deserialize)]
pub struct ItemMetadata {
    #[serde(rename = "ratingKey")]
    pub rating_key: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "parentTitle")]
    pub parent_title: Option<String>,
    #[serde(rename = "grandparentTitle")]
    pub grandparent_title: Option<String>,
    #[serde(rename = "originalTitle")]
    pub original_title: Option<String>,
    pub index: Option<u32>,
    #[serde(rename = "parentIndex")]
    pub parent_index: Option<u32>,
    pub year: Option<u32>,
    #[serde(rename = "Media", default)]
    pub media: Vec<MediaMetadata>,
}

/// One version of an item
#[derive(Debug, Clone, Deserialize)]
pub struct MediaMetadata {
    pub container: Option<String>,
    #[serde(rename = "Part", default)]
    pub parts: Vec<PartMetadata>,
}

/// One physical file backing a media version
#[derive(Debug, Clone, Deserialize)]
pub struct PartMetadata {
    pub key: String,
    pub size: Option<u64>,
    pub file: Option<String>,
    pub container: Option<String>,
}

impl From<PlaylistMetadata> for PlaylistHandle {
    fn from(meta: PlaylistMetadata) -> Self {
        Self {
            rating_key: meta.rating_key,
            title: meta.title,
            playlist_type: meta.playlist_type.unwrap_or_default(),
            leaf_count: meta.leaf_count.unwrap_or(0),
            summary: meta.summary.unwrap_or_default(),
            smart: meta.smart.unwrap_or(false),
        }
    }
}

impl From<ItemMetadata> for MediaItem {
    fn from(meta: ItemMetadata) -> Self {
        // The first version decides the container; its parts come first so
        // `primary_part` is media[0].parts[0].
        let container = meta
            .media
            .first()
            .and_then(|m| m.container.clone())
            .or_else(|| {
                meta.media
                    .first()
                    .and_then(|m| m.parts.first())
                    .and_then(|p| p.container.clone())
            });

        let parts = meta
            .media
            .into_iter()
            .flat_map(|m| m.parts)
            .map(|p| MediaPart {
                key: p.key,
                size: p.size,
                file: p.file,
            })
            .collect();

        Self {
            rating_key: meta.rating_key,
            kind: MediaKind::parse(meta.kind.as_deref().unwrap_or("")),
            title: meta.title.unwrap_or_default(),
            parent_title: non_empty(meta.parent_title),
            grandparent_title: non_empty(meta.grandparent_title),
            original_title: non_empty(meta.original_title),
            index: meta.index,
            parent_index: meta.parent_index,
            year: meta.year,
            container,
            parts,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
