//! plexpull - Download Plex Media Server playlists to a local directory

use anyhow::Result;
use clap::Parser;
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod download;
mod plex;
mod store;
mod utils;

use cli::{Cli, Commands};
use store::StorePaths;
use utils::GatedLayer;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = StorePaths::resolve(cli.config_dir.clone())?;

    // Initialize logging
    let filter = if cli.verbose {
        "plexpull=debug,reqwest=debug"
    } else {
        "plexpull=info"
    };

    let (file_layer, log_error) = match open_log_file(&paths.log_file()) {
        Ok(file) => {
            let layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false);
            (Some(layer), None)
        }
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(GatedLayer::new(
            fmt::layer().with_writer(std::io::stderr).with_target(false),
        ))
        .with(file_layer)
        .init();

    if let Some(e) = log_error {
        warn!("Logging to {} disabled: {}", paths.log_file().display(), e);
    }

    match cli.command {
        Commands::Configure {
            address,
            token,
            download_dir,
            transfer_mode,
            no_verify,
        } => {
            cli::commands::configure(&paths, address, token, download_dir, transfer_mode, no_verify)
                .await?;
        }
        Commands::Playlists { refresh, kind } => {
            cli::commands::playlists(&paths, refresh, kind).await?;
        }
        Commands::Download { titles, dest } => {
            cli::commands::download(&paths, titles, dest).await?;
        }
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
        }
    }

    Ok(())
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
