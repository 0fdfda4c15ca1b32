//! Plex Media Server session

pub mod auth;
pub mod client;
mod models;
pub mod session;
pub mod summary;

pub use client::{PlexClient, TransferMode};
pub use session::{MediaItem, MediaKind, MediaPart, MediaServer, PlaylistHandle};
pub use summary::{PlaylistKind, PlaylistSummary};
