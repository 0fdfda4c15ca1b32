//! Terminal rendering of download events

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::download::{DownloadEvent, EntryStatus, QueueEntry, TransferProgress};
use crate::utils::{ProgressGuard, format_rate};

/// Progress bars for one download session
///
/// One bar counts finished playlists, the other follows the item being
/// transferred. Stderr logging is muted while the bars are alive.
pub struct ProgressView {
    multi: MultiProgress,
    playlists: ProgressBar,
    item: ProgressBar,
    _quiet_logs: ProgressGuard,
}

impl ProgressView {
    pub fn new(playlist_count: usize) -> Self {
        let multi = MultiProgress::new();

        let playlists = multi.add(ProgressBar::new(playlist_count as u64));
        playlists.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Playlists [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );

        let item = multi.add(ProgressBar::new(100));
        item.set_style(
            ProgressStyle::default_bar()
                .template("  [{bar:30.green/white}] {pos:>3}% {msg}")
                .unwrap()
                .progress_chars("=> "),
        );

        Self {
            multi,
            playlists,
            item,
            _quiet_logs: ProgressGuard::activate(),
        }
    }

    pub fn handle(&self, event: DownloadEvent) {
        match event {
            DownloadEvent::Status(status) => self.playlists.set_message(status),
            DownloadEvent::Progress(progress) => self.show_progress(&progress),
            DownloadEvent::ItemFinished { .. } => self.item.set_position(100),
            DownloadEvent::ItemFailed { file_name, error } => {
                self.println(format!("  {} {}: {}", "x".red(), file_name, error));
            }
            DownloadEvent::EntryChanged { entry, .. } => self.show_entry(&entry),
        }
    }

    fn show_progress(&self, progress: &TransferProgress) {
        self.item.set_position(u64::from(progress.percent_complete));
        self.item.set_message(format!(
            "[{}/{}] {} ({}, avg {})",
            progress.item_index,
            progress.item_count,
            progress.file_name,
            format_rate(progress.instantaneous_bps),
            format_rate(progress.cumulative_bps)
        ));
    }

    fn show_entry(&self, entry: &QueueEntry) {
        match entry.status {
            EntryStatus::Downloading if entry.downloaded == 0 => {
                self.item.reset();
                self.println(format!("{} {}", "Downloading".cyan().bold(), entry.title()));
            }
            EntryStatus::Completed | EntryStatus::Stopped => {
                self.playlists.inc(1);
                let message = entry.message.as_deref().unwrap_or_default();
                let line = if entry.status == EntryStatus::Completed {
                    message.green()
                } else {
                    message.yellow()
                };
                self.println(format!("  {}", line));
            }
            _ => {}
        }
    }

    /// Print above the bars without tearing them
    pub fn println(&self, line: String) {
        let _ = self.multi.println(line);
    }

    pub fn finish(self) {
        self.item.finish_and_clear();
        self.playlists.finish_and_clear();
    }
}
