//! CLI module for plexpull

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;
mod progress;

use crate::plex::{PlaylistKind, TransferMode};

#[derive(Parser, Debug)]
#[command(name = "plexpull", about = "Download Plex playlists to a local directory")]
#[command(version, author)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding config, cache and log files
    #[arg(long, global = true, env = "PLEXPULL_CONFIG_DIR", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set the Plex server, token and download location
    Configure {
        /// Plex server address (e.g. http://192.168.1.10:32400)
        #[arg(long, env = "PLEX_ADDRESS")]
        address: Option<String>,

        /// Plex authentication token
        #[arg(long, env = "PLEX_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Default directory playlists are downloaded into
        #[arg(long, value_name = "DIR")]
        download_dir: Option<PathBuf>,

        /// How media files are fetched
        #[arg(long, value_enum)]
        transfer_mode: Option<TransferMode>,

        /// Save without connecting to the server first
        #[arg(long)]
        no_verify: bool,
    },

    /// List playlists with their type, item count and size
    Playlists {
        /// Fetch every playlist from the server instead of using the cache
        #[arg(short, long)]
        refresh: bool,

        /// Only show playlists of this kind
        #[arg(long, value_enum, default_value_t = KindFilter::All)]
        kind: KindFilter,
    },

    /// Download one or more playlists, one after another
    Download {
        /// Playlist titles, downloaded in the order given
        #[arg(value_name = "TITLE", required = true)]
        titles: Vec<String>,

        /// Destination root (defaults to the configured download directory)
        #[arg(short, long, value_name = "DIR")]
        dest: Option<PathBuf>,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindFilter {
    Music,
    Video,
    All,
}

impl KindFilter {
    pub fn accepts(&self, kind: PlaylistKind) -> bool {
        match self {
            Self::Music => kind == PlaylistKind::Music,
            Self::Video => kind == PlaylistKind::Video,
            Self::All => true,
        }
    }
}
