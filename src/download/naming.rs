//! On-disk names for playlist items and playlist folders
//!
//! Pure functions: the same item always maps to the same name, and two items
//! that map to the same name are treated as the same destination file.

use std::fmt;

use crate::plex::{MediaItem, MediaKind, PlaylistHandle};
use crate::utils::{sanitize_filename, sanitize_or};

/// Extension used when the server gives no container hint
pub const DEFAULT_EXTENSION: &str = "mp4";

/// Top-level folder a playlist is stored under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFolder {
    Music,
    Video,
    UnknownType,
}

impl MediaFolder {
    /// Classify by the kind of the playlist's first item
    pub fn for_kind(kind: Option<&MediaKind>) -> Self {
        match kind {
            Some(MediaKind::Track) => Self::Music,
            Some(k) if k.is_video() => Self::Video,
            _ => Self::UnknownType,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Music => "Music",
            Self::Video => "Video",
            Self::UnknownType => "UnknownType",
        }
    }
}

impl fmt::Display for MediaFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full file name (stem + extension) for an item
pub fn derive_file_name(item: &MediaItem) -> String {
    format!("{}.{}", derive_stem(item), extension(item))
}

/// Sanitized file name without extension
pub fn derive_stem(item: &MediaItem) -> String {
    let raw = match item.kind {
        MediaKind::Track => track_stem(item),
        MediaKind::Episode => episode_stem(item),
        MediaKind::Movie => match item.year {
            Some(year) => format!("{} ({})", item.title, year),
            None => item.title.clone(),
        },
        MediaKind::Other(_) => item.title.clone(),
    };

    sanitize_or(&raw, || format!("item_{}", item.rating_key))
}

/// Folder name for a playlist (without the media-type prefix)
pub fn playlist_folder_name(playlist: &PlaylistHandle) -> String {
    sanitize_or(&playlist.title, || format!("playlist_{}", playlist.rating_key))
}

fn track_stem(item: &MediaItem) -> String {
    let artist = item
        .grandparent_title
        .as_deref()
        .or(item.original_title.as_deref());
    let album = item.parent_title.as_deref();

    match (artist, album, item.index) {
        (Some(artist), Some(album), Some(index)) => {
            format!("{} - {} - {:02} - {}", artist, album, index, item.title)
        }
        (Some(artist), Some(album), None) => format!("{} - {} - {}", artist, album, item.title),
        (Some(artist), None, _) => format!("{} - {}", artist, item.title),
        _ => item.title.clone(),
    }
}

fn episode_stem(item: &MediaItem) -> String {
    match (item.grandparent_title.as_deref(), item.parent_index, item.index) {
        (Some(show), Some(season), Some(episode)) => {
            format!("{} - S{:02}E{:02} - {}", show, season, episode, item.title)
        }
        (Some(show), _, _) => format!("{} - {}", show, item.title),
        _ => item.title.clone(),
    }
}

fn extension(item: &MediaItem) -> String {
    item.container
        .as_deref()
        .map(|c| sanitize_filename(c).to_lowercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}
