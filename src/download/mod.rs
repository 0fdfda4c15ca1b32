//! Download orchestration: naming, byte transfer, per-playlist runs and the queue

mod naming;
mod playlist;
mod progress;
mod queue;
mod transfer;

#[cfg(test)]
pub(crate) mod testing;

pub use playlist::{PlaylistDownloader, PlaylistReport};
pub use progress::{CancelFlag, DownloadEvent, TransferProgress};
pub use queue::{DownloadQueue, EntryStatus, QueueEntry, QueueError};
pub use transfer::{TransferEngine, TransferError, TransferSource};
