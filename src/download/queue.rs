//! Ordered queue of playlist downloads
//!
//! Entries are processed strictly one at a time in insertion order. Each entry
//! moves `Queued -> Downloading -> Completed | Stopped` exactly once; a stopped
//! playlist can be queued again as a new entry.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::playlist::{PlaylistDownloader, PlaylistReport};
use super::progress::DownloadEvent;
use crate::plex::{MediaServer, PlaylistHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryStatus {
    Queued,
    Downloading,
    Completed,
    Stopped,
}

impl EntryStatus {
    /// Still waiting or running
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Queued | Self::Downloading)
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Queued => "Queued",
            Self::Downloading => "Downloading",
            Self::Completed => "Completed",
            Self::Stopped => "Stopped",
        };
        f.write_str(s)
    }
}

/// One queued playlist and its live counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueEntry {
    pub playlist: PlaylistHandle,
    pub status: EntryStatus,
    pub downloaded: usize,
    pub remaining: usize,
    /// Final summary or fatal error of the last run
    pub message: Option<String>,
    pub item_errors: Vec<String>,
}

impl QueueEntry {
    fn new(playlist: PlaylistHandle) -> Self {
        let remaining = playlist.leaf_count as usize;
        Self {
            playlist,
            status: EntryStatus::Queued,
            downloaded: 0,
            remaining,
            message: None,
            item_errors: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.playlist.title
    }

    fn finish(&mut self, report: PlaylistReport) {
        if report.success {
            self.status = EntryStatus::Completed;
            self.remaining = 0;
        } else {
            self.status = EntryStatus::Stopped;
        }
        self.message = Some(report.message);
        self.item_errors = report.item_errors;
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("no queue entry at position {0}")]
    NoSuchEntry(usize),

    #[error("'{0}' is downloading and cannot be removed")]
    EntryBusy(String),

    #[error("the queue cannot be cleared while a download is in progress")]
    Busy,
}

/// Sequential download queue
#[derive(Debug, Default)]
pub struct DownloadQueue {
    entries: Vec<QueueEntry>,
}

impl DownloadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a playlist; refused when the same title is already queued or running
    pub fn enqueue(&mut self, playlist: PlaylistHandle) -> bool {
        let duplicate = self
            .entries
            .iter()
            .any(|e| e.status.is_pending() && e.playlist.title == playlist.title);

        if duplicate {
            debug!("'{}' is already in the queue", playlist.title);
            return false;
        }

        debug!("Queued '{}'", playlist.title);
        self.entries.push(QueueEntry::new(playlist));
        true
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn remove(&mut self, index: usize) -> Result<QueueEntry, QueueError> {
        match self.entries.get(index) {
            None => Err(QueueError::NoSuchEntry(index)),
            Some(entry) if entry.status == EntryStatus::Downloading => {
                Err(QueueError::EntryBusy(entry.title().to_string()))
            }
            Some(_) => Ok(self.entries.remove(index)),
        }
    }

    pub fn clear(&mut self) -> Result<(), QueueError> {
        if self
            .entries
            .iter()
            .any(|e| e.status == EntryStatus::Downloading)
        {
            return Err(QueueError::Busy);
        }
        self.entries.clear();
        Ok(())
    }

    /// Run the first queued entry to completion
    ///
    /// Returns the index of the processed entry, or `None` when nothing is
    /// queued.
    pub async fn process_next<S: MediaServer>(
        &mut self,
        downloader: &PlaylistDownloader<S>,
        destination_root: &Path,
        events: &UnboundedSender<DownloadEvent>,
    ) -> Option<usize> {
        let index = self
            .entries
            .iter()
            .position(|e| e.status == EntryStatus::Queued)?;

        let entry = &mut self.entries[index];
        entry.status = EntryStatus::Downloading;
        entry.downloaded = 0;
        post(events, index, entry);

        let playlist = entry.playlist.clone();
        info!("Processing queue entry {}: '{}'", index + 1, playlist.title);

        let report = downloader
            .download_playlist(&playlist, destination_root, &mut |event| {
                let changed = match &event {
                    DownloadEvent::ItemFinished {
                        item_index,
                        item_count,
                    } => {
                        debug!("Entry {}: item {}/{} on disk", index + 1, item_index, item_count);
                        entry.downloaded += 1;
                        entry.remaining = item_count.saturating_sub(entry.downloaded);
                        true
                    }
                    // The server's item count wins over the listed leaf count;
                    // the next finished item publishes it
                    DownloadEvent::Progress(p) => {
                        entry.remaining = p.item_count.saturating_sub(entry.downloaded);
                        false
                    }
                    _ => false,
                };
                let _ = events.send(event);
                if changed {
                    post(events, index, entry);
                }
            })
            .await;

        if !report.success && !report.cancelled {
            warn!("Playlist '{}' failed: {}", playlist.title, report.message);
        }

        entry.finish(report);
        post(events, index, entry);
        Some(index)
    }

    /// Process queued entries until none is left or the downloader is cancelled
    ///
    /// Returns how many entries were processed.
    pub async fn run<S: MediaServer>(
        &mut self,
        downloader: &PlaylistDownloader<S>,
        destination_root: &Path,
        events: &UnboundedSender<DownloadEvent>,
    ) -> usize {
        let cancel = downloader.cancel_flag();
        let mut processed = 0;

        while !cancel.is_cancelled() {
            match self.process_next(downloader, destination_root, events).await {
                Some(_) => processed += 1,
                None => break,
            }
        }

        if cancel.is_cancelled() {
            info!("Queue halted with {} entries waiting", self.queued_count());
        }
        processed
    }

    fn queued_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Queued)
            .count()
    }
}

fn post(events: &UnboundedSender<DownloadEvent>, index: usize, entry: &QueueEntry) {
    let _ = events.send(DownloadEvent::EntryChanged {
        index,
        entry: entry.clone(),
    });
}
