//! Per-playlist download orchestration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, error, info, warn};

use super::naming::{MediaFolder, derive_file_name, playlist_folder_name};
use super::progress::{CancelFlag, DownloadEvent, EventSink, ThroughputMeter, TransferProgress};
use super::transfer::{TransferEngine, TransferError};
use crate::plex::{MediaItem, MediaServer, PlaylistHandle};
use crate::utils::megabytes_per_second;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Outcome of one playlist run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistReport {
    /// The item loop ran to the end without being cancelled
    pub success: bool,
    pub cancelled: bool,
    /// Human-readable summary or fatal error
    pub message: String,
    /// `"{file_name}: {error}"` per failed item
    pub item_errors: Vec<String>,
    pub item_count: usize,
    /// Items transferred in this run
    pub downloaded: usize,
    /// Items already present on disk
    pub skipped: usize,
    /// Items never reached because of cancellation (including the interrupted one)
    pub not_attempted: usize,
    pub bytes: u64,
}

impl PlaylistReport {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            ..Default::default()
        }
    }

    /// Completed with no item errors
    pub fn is_clean(&self) -> bool {
        self.success && self.item_errors.is_empty()
    }
}

/// Downloads the items of one playlist at a time into a destination root
pub struct PlaylistDownloader<S: MediaServer> {
    server: Arc<S>,
    engine: TransferEngine,
    cancel: CancelFlag,
}

impl<S: MediaServer> PlaylistDownloader<S> {
    pub fn new(server: Arc<S>, engine: TransferEngine) -> Self {
        Self {
            server,
            engine,
            cancel: CancelFlag::new(),
        }
    }

    /// Flag that stops the current and any following playlist when set
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    /// Re-resolve a playlist by title, then download it
    pub async fn download_by_title(
        &self,
        title: &str,
        destination_root: &Path,
        on_event: &mut EventSink<'_>,
    ) -> PlaylistReport {
        on_event(DownloadEvent::Status(format!("Looking up playlist '{}'", title)));

        match self.server.find_playlist(title).await {
            Ok(playlist) => {
                self.download_playlist(&playlist, destination_root, on_event)
                    .await
            }
            Err(e) => {
                error!("Failed to resolve playlist '{}': {:#}", title, e);
                let report = PlaylistReport::failed(format!("{:#}", e));
                on_event(DownloadEvent::Status(report.message.clone()));
                report
            }
        }
    }

    /// Download every item of `playlist` under `destination_root`
    ///
    /// Items are fetched from the server right before downloading, so the
    /// playlist contents are whatever the server holds now. Per-item failures
    /// are collected in the report and never stop the run; only item
    /// resolution and destination directory failures are fatal.
    pub async fn download_playlist(
        &self,
        playlist: &PlaylistHandle,
        destination_root: &Path,
        on_event: &mut EventSink<'_>,
    ) -> PlaylistReport {
        let title = playlist.title.as_str();
        info!("Starting download of playlist '{}'", title);
        on_event(DownloadEvent::Status(format!("Fetching items for '{}'", title)));

        let items = match self.server.playlist_items(playlist).await {
            Ok(items) => items,
            Err(e) => {
                error!("Failed to fetch items for '{}': {:#}", title, e);
                let report = PlaylistReport::failed(format!(
                    "Failed to fetch items for '{}': {:#}",
                    title, e
                ));
                on_event(DownloadEvent::Status(report.message.clone()));
                return report;
            }
        };

        if items.is_empty() {
            let message = format!("Playlist '{}' is empty. Nothing to download.", title);
            info!("{}", message);
            on_event(DownloadEvent::Status(message.clone()));
            return PlaylistReport {
                success: true,
                message,
                ..Default::default()
            };
        }

        let folder = MediaFolder::for_kind(items.first().map(|i| &i.kind));
        let directory = playlist_directory(destination_root, folder, playlist);

        if let Err(e) = fs::create_dir_all(&directory).await {
            error!("Failed to create directory {}: {}", directory.display(), e);
            let report = PlaylistReport::failed(format!(
                "Failed to create directory {}: {}",
                directory.display(),
                e
            ));
            on_event(DownloadEvent::Status(report.message.clone()));
            return PlaylistReport {
                item_count: items.len(),
                not_attempted: items.len(),
                ..report
            };
        }

        let report = self.download_items(title, &items, &directory, on_event).await;
        on_event(DownloadEvent::Status(report.message.clone()));
        report
    }

    async fn download_items(
        &self,
        title: &str,
        items: &[MediaItem],
        directory: &Path,
        on_event: &mut EventSink<'_>,
    ) -> PlaylistReport {
        let item_count = items.len();
        let mut meter = ThroughputMeter::start();
        let mut report = PlaylistReport {
            item_count,
            ..Default::default()
        };

        for (position, item) in items.iter().enumerate() {
            let item_index = position + 1;

            if self.cancel.is_cancelled() {
                report.cancelled = true;
                report.not_attempted = item_count - position;
                break;
            }

            let file_name = derive_file_name(item);
            let destination = directory.join(&file_name);
            let progress = |percent_complete: u8, instantaneous_bps: f64, meter: &ThroughputMeter| {
                DownloadEvent::Progress(TransferProgress {
                    item_index,
                    item_count,
                    file_name: file_name.clone(),
                    percent_complete,
                    instantaneous_bps,
                    cumulative_bps: meter.cumulative_bps(),
                })
            };

            if fs::try_exists(&destination).await.unwrap_or(false) {
                debug!("Skipping existing file {}", destination.display());
                report.skipped += 1;
                on_event(progress(100, 0.0, &meter));
                on_event(DownloadEvent::ItemFinished {
                    item_index,
                    item_count,
                });
                continue;
            }

            let Some(part) = item.primary_part() else {
                record_failure(&mut report, &file_name, "item has no downloadable media", on_event);
                continue;
            };

            on_event(DownloadEvent::Status(format!("Downloading {}", file_name)));
            on_event(progress(0, 0.0, &meter));

            let source = self.server.source_for(part);
            let result = self
                .engine
                .transfer(
                    &source,
                    &destination,
                    part.size,
                    &mut meter,
                    &mut |tick| {
                        on_event(DownloadEvent::Progress(TransferProgress {
                            item_index,
                            item_count,
                            file_name: file_name.clone(),
                            percent_complete: tick.percent.unwrap_or(0),
                            instantaneous_bps: tick.instantaneous_bps,
                            cumulative_bps: tick.cumulative_bps,
                        }))
                    },
                    &self.cancel,
                )
                .await;

            match result {
                Ok(stats) => {
                    debug!("Downloaded {} ({} bytes)", file_name, stats.bytes);
                    report.downloaded += 1;
                    report.bytes += stats.bytes;
                    on_event(progress(100, 0.0, &meter));
                    on_event(DownloadEvent::ItemFinished {
                        item_index,
                        item_count,
                    });
                }
                Err(TransferError::Cancelled) => {
                    report.cancelled = true;
                    report.not_attempted = item_count - position;
                    break;
                }
                Err(e) => record_failure(&mut report, &file_name, &e.to_string(), on_event),
            }
        }

        report.success = !report.cancelled;
        report.message = if report.cancelled {
            info!(
                "Download of '{}' stopped ({} downloaded, {} not attempted)",
                title, report.downloaded, report.not_attempted
            );
            format!("Download of '{}' stopped", title)
        } else {
            let mut message = format!(
                "Completed downloading playlist: {} ({:.2} MB at {:.2} MB/s)",
                title,
                meter.total_bytes() as f64 / BYTES_PER_MB,
                megabytes_per_second(meter.cumulative_bps())
            );
            if !report.item_errors.is_empty() {
                message.push_str(&format!(" with {} error(s)", report.item_errors.len()));
            }
            info!("{}", message);
            message
        };

        report
    }
}

/// `{root}/{Music|Video|UnknownType}/{playlist}`
pub fn playlist_directory(root: &Path, folder: MediaFolder, playlist: &PlaylistHandle) -> PathBuf {
    root.join(folder.as_str()).join(playlist_folder_name(playlist))
}

fn record_failure(
    report: &mut PlaylistReport,
    file_name: &str,
    error: &str,
    on_event: &mut EventSink<'_>,
) {
    warn!("Failed to download {}: {}", file_name, error);
    report.item_errors.push(format!("{}: {}", file_name, error));
    on_event(DownloadEvent::ItemFailed {
        file_name: file_name.to_string(),
        error: error.to_string(),
    });
}
