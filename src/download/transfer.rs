//! Chunked byte transfer with throughput reporting and cancellation
//!
//! Local files and authenticated HTTP streams are both turned into a stream of
//! chunks, so the copy loop below is the same for either source. Bytes land in
//! a `.part` sibling first and are renamed onto the destination only once the
//! size has been verified; an interrupted or failed transfer never leaves a
//! file under the final name.

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use super::progress::{CancelFlag, ProgressGate, ThroughputMeter, percent};

/// Read/write unit
pub const CHUNK_SIZE: usize = 32 * 1024;

/// Minimum spacing between progress ticks
pub const EMIT_INTERVAL: Duration = Duration::from_millis(100);

const PART_SUFFIX: &str = "part";

/// Where the bytes of an item come from
#[derive(Debug, Clone)]
pub enum TransferSource {
    /// A file reachable on this machine
    Local(PathBuf),
    /// A server resource fetched with an authenticated GET
    Http { url: String, headers: HeaderMap },
}

impl TransferSource {
    pub fn describe(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Http { url, .. } => url.clone(),
        }
    }
}

/// Why a transfer did not produce a file
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("transfer cancelled")]
    Cancelled,

    #[error("size mismatch: expected {expected} bytes, received {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("source file not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("server responded with HTTP {0}")]
    Status(StatusCode),

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Rate-limited progress tick for the item being transferred
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferTick {
    pub bytes_copied: u64,
    /// `None` while the expected size is unknown
    pub percent: Option<u8>,
    pub instantaneous_bps: f64,
    pub cumulative_bps: f64,
}

/// Result of a successful transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferStats {
    pub bytes: u64,
    pub elapsed: Duration,
}

type ChunkStream = BoxStream<'static, io::Result<Bytes>>;

/// Copies one source to one destination at a time
#[derive(Debug, Clone)]
pub struct TransferEngine {
    http: Client,
    chunk_size: usize,
    emit_interval: Duration,
}

impl TransferEngine {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            chunk_size: CHUNK_SIZE,
            emit_interval: EMIT_INTERVAL,
        }
    }

    /// Override the tick spacing (tests use zero to observe every chunk)
    pub fn with_emit_interval(mut self, interval: Duration) -> Self {
        self.emit_interval = interval;
        self
    }

    /// Copy `source` to `destination`
    ///
    /// `expected_size` of `None` (or zero) means the size is unknown: progress
    /// reads 0% until the end and no size verification happens. For HTTP
    /// sources the response `Content-Length` fills in an unknown size.
    pub async fn transfer(
        &self,
        source: &TransferSource,
        destination: &Path,
        expected_size: Option<u64>,
        meter: &mut ThroughputMeter,
        on_tick: &mut (dyn FnMut(TransferTick) + Send),
        cancel: &CancelFlag,
    ) -> Result<TransferStats, TransferError> {
        let started = Instant::now();
        let (chunks, expected) = self.open(source, expected_size).await?;
        let partial = partial_path(destination);

        let result = self
            .copy_chunks(chunks, &partial, expected, meter, on_tick, cancel)
            .await;

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                discard(&partial).await;
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&partial, destination).await {
            discard(&partial).await;
            return Err(e.into());
        }

        debug!(
            "Transferred {} bytes from {} to {}",
            bytes,
            source.describe(),
            destination.display()
        );

        Ok(TransferStats {
            bytes,
            elapsed: started.elapsed(),
        })
    }

    /// Turn a source into a chunk stream plus the size to verify against
    async fn open(
        &self,
        source: &TransferSource,
        expected_size: Option<u64>,
    ) -> Result<(ChunkStream, Option<u64>), TransferError> {
        match source {
            TransferSource::Local(path) => {
                let file = match File::open(path).await {
                    Ok(file) => file,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        return Err(TransferError::MissingSource(path.clone()));
                    }
                    Err(e) => return Err(e.into()),
                };
                Ok((file_chunks(file, self.chunk_size), expected_size))
            }
            TransferSource::Http { url, headers } => {
                debug!("Requesting {}", url);
                let response = self.http.get(url).headers(headers.clone()).send().await?;

                if !response.status().is_success() {
                    return Err(TransferError::Status(response.status()));
                }

                let expected = expected_size
                    .filter(|size| *size > 0)
                    .or(response.content_length());

                let chunks = response.bytes_stream().map(|r| r.map_err(io::Error::other));
                Ok((chunks.boxed(), expected))
            }
        }
    }

    async fn copy_chunks(
        &self,
        mut chunks: ChunkStream,
        partial: &Path,
        expected: Option<u64>,
        meter: &mut ThroughputMeter,
        on_tick: &mut (dyn FnMut(TransferTick) + Send),
        cancel: &CancelFlag,
    ) -> Result<u64, TransferError> {
        let file = File::create(partial).await?;
        let mut writer = BufWriter::with_capacity(self.chunk_size, file);
        let mut gate = ProgressGate::new(self.emit_interval, Instant::now());
        let mut copied: u64 = 0;

        while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                // A source that closes early is short, not broken
                Err(e) => match expected {
                    Some(expected) if copied < expected => {
                        debug!("Source ended after {} of {} bytes: {}", copied, expected, e);
                        return Err(TransferError::SizeMismatch {
                            expected,
                            actual: copied,
                        });
                    }
                    _ => return Err(e.into()),
                },
            };

            // Network chunks can be large; keep the cancellation check per slice
            for slice in chunk.chunks(self.chunk_size) {
                if cancel.is_cancelled() {
                    debug!("Transfer cancelled after {} bytes", copied);
                    return Err(TransferError::Cancelled);
                }

                writer.write_all(slice).await?;
                let len = slice.len() as u64;
                copied += len;
                meter.record(len);

                if let Some(instantaneous_bps) = gate.observe(len, Instant::now()) {
                    on_tick(TransferTick {
                        bytes_copied: copied,
                        percent: percent(copied, expected),
                        instantaneous_bps,
                        cumulative_bps: meter.cumulative_bps(),
                    });
                }
            }
        }

        writer.flush().await?;
        writer.into_inner().sync_all().await?;

        if let Some(expected) = expected.filter(|size| *size > 0) {
            if copied != expected {
                return Err(TransferError::SizeMismatch {
                    expected,
                    actual: copied,
                });
            }
        }

        Ok(copied)
    }
}

/// `song.mp3` -> `song.mp3.part`
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(PART_SUFFIX);
    destination.with_file_name(name)
}

async fn discard(partial: &Path) {
    match fs::remove_file(partial).await {
        Ok(()) => debug!("Removed partial file {}", partial.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial file {}: {}", partial.display(), e),
    }
}

fn file_chunks(file: File, chunk_size: usize) -> ChunkStream {
    stream::try_unfold(file, move |mut file| async move {
        let mut buf = vec![0u8; chunk_size];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok::<_, io::Error>(Some((Bytes::from(buf), file)))
    })
    .boxed()
}
