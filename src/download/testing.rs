//! In-memory media server serving local files

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::TransferSource;
use crate::plex::{MediaItem, MediaKind, MediaPart, MediaServer, PlaylistHandle};

#[derive(Default)]
pub struct FakeServer {
    playlists: Vec<PlaylistHandle>,
    items: HashMap<String, Vec<MediaItem>>,
    /// Titles of every playlist whose items were requested, in order
    pub fetched: Mutex<Vec<String>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(mut self, playlist: &PlaylistHandle, items: Vec<MediaItem>) -> Self {
        self.playlists.push(playlist.clone());
        self.items.insert(playlist.rating_key.clone(), items);
        self
    }

    /// List a playlist whose items cannot be fetched
    pub fn with_broken(mut self, playlist: &PlaylistHandle) -> Self {
        self.playlists.push(playlist.clone());
        self
    }
}

#[async_trait]
impl MediaServer for FakeServer {
    async fn playlists(&self) -> Result<Vec<PlaylistHandle>> {
        Ok(self.playlists.clone())
    }

    async fn playlist_items(&self, playlist: &PlaylistHandle) -> Result<Vec<MediaItem>> {
        if let Ok(mut fetched) = self.fetched.lock() {
            fetched.push(playlist.title.clone());
        }
        match self.items.get(&playlist.rating_key) {
            Some(items) => Ok(items.clone()),
            None => bail!("playlist {} has no items endpoint", playlist.rating_key),
        }
    }

    fn source_for(&self, part: &MediaPart) -> TransferSource {
        TransferSource::Local(PathBuf::from(part.file.clone().unwrap_or_default()))
    }
}

pub fn playlist(rating_key: &str, title: &str) -> PlaylistHandle {
    PlaylistHandle {
        rating_key: rating_key.to_string(),
        title: title.to_string(),
        playlist_type: "audio".to_string(),
        leaf_count: 0,
        summary: String::new(),
        smart: false,
    }
}

/// A track backed by a freshly written file of `size` bytes under `dir`
pub fn track(dir: &Path, rating_key: &str, title: &str, index: u32, size: usize) -> MediaItem {
    let file = dir.join(format!("{}.src", rating_key));
    let data: Vec<u8> = (0..size).map(|i| (i % 253) as u8).collect();
    std::fs::write(&file, data).unwrap();

    MediaItem {
        rating_key: rating_key.to_string(),
        kind: MediaKind::Track,
        title: title.to_string(),
        parent_title: Some("Album".to_string()),
        grandparent_title: Some("Artist".to_string()),
        original_title: None,
        index: Some(index),
        parent_index: None,
        year: None,
        container: Some("mp3".to_string()),
        parts: vec![MediaPart {
            key: format!("/library/parts/{}/file.mp3", rating_key),
            size: Some(size as u64),
            file: Some(file.to_string_lossy().into_owned()),
        }],
    }
}
