//! CLI command handlers

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::generate;
use colored::Colorize;
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::progress::ProgressView;
use super::{Cli, KindFilter};
use crate::download::{CancelFlag, DownloadQueue, EntryStatus, PlaylistDownloader, TransferEngine};
use crate::plex::summary::collect_summaries;
use crate::plex::{MediaServer, PlexClient, TransferMode};
use crate::store::{Config, PlaylistCache, StorePaths};

/// Handle the `configure` command
pub async fn configure(
    paths: &StorePaths,
    address: Option<String>,
    token: Option<String>,
    download_dir: Option<PathBuf>,
    transfer_mode: Option<TransferMode>,
    no_verify: bool,
) -> Result<()> {
    let config_file = paths.config_file();
    let mut config = Config::load(&config_file);
    let attended = console::user_attended();

    if let Some(address) = address {
        config.plex_address = address;
    } else if attended {
        config.plex_address = Input::new()
            .with_prompt("Plex server address")
            .default(config.plex_address.clone())
            .interact_text()
            .context("Failed to read server address")?;
    }

    if let Some(token) = token {
        config.plex_token = token;
    } else if attended && !config.has_token() {
        config.plex_token = Password::new()
            .with_prompt("Plex token")
            .interact()
            .context("Failed to read token")?;
    }

    if let Some(dir) = download_dir {
        config.download_directory = dir;
    }
    if let Some(mode) = transfer_mode {
        config.transfer_mode = mode;
    }

    if !config.has_token() {
        anyhow::bail!("A Plex token is required. Pass --token or set PLEX_TOKEN.");
    }

    if no_verify {
        debug!("Skipping server verification");
    } else {
        println!("{}", "Connecting to Plex server...".cyan());
        let client = connect(&config).await?;
        println!("{} {}", "Connected to".green(), client.server_name().bold());
    }

    config.save(&config_file)?;
    info!("Configuration saved to {}", config_file.display());

    println!();
    println!("  Server:    {}", config.plex_address);
    println!("  Downloads: {}", config.download_directory.display());
    println!("  Transfer:  {:?}", config.transfer_mode);

    Ok(())
}

/// Handle the `playlists` command
pub async fn playlists(paths: &StorePaths, refresh: bool, kind: KindFilter) -> Result<()> {
    let cache_file = paths.cache_file();

    let cache = if refresh {
        let config = load_configured(paths)?;
        let client = connect(&config).await?;

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(format!("Reading playlists from {}...", client.server_name()));

        let summaries = collect_summaries(&client).await;
        spinner.finish_and_clear();

        let cache = PlaylistCache::new(summaries?);
        if let Err(e) = cache.save(&cache_file) {
            warn!("Could not update playlist cache: {:#}", e);
        }
        cache
    } else {
        PlaylistCache::load(&cache_file)
    };

    if cache.is_empty() {
        println!(
            "{}",
            "No cached playlists. Run 'plexpull playlists --refresh' to read them from the server."
                .yellow()
        );
        return Ok(());
    }

    let shown: Vec<_> = cache
        .playlists
        .iter()
        .filter(|p| kind.accepts(p.kind))
        .collect();

    let width = shown.iter().map(|p| p.title.chars().count()).max().unwrap_or(5).max(5);
    println!(
        "{}",
        format!("{:<width$}  {:<7}  {:>6}  {:>10}", "Title", "Type", "Items", "Size").bold()
    );
    for playlist in &shown {
        println!(
            "{:<width$}  {:<7}  {:>6}  {:>10}",
            playlist.title,
            playlist.kind.to_string(),
            playlist.item_count,
            playlist.display_size
        );
    }

    println!();
    println!("{} playlist(s), cached {}", shown.len(), cache.date());
    Ok(())
}

/// Handle the `download` command
pub async fn download(
    paths: &StorePaths,
    titles: Vec<String>,
    dest: Option<PathBuf>,
) -> Result<()> {
    let config = load_configured(paths)?;
    let root = dest.unwrap_or_else(|| config.download_directory.clone());

    println!("{}", "Connecting to Plex server...".cyan());
    let client = connect(&config).await?;
    println!("{} {}", "Connected to".green(), client.server_name().bold());

    let available = client.playlists().await?;
    let mut queue = DownloadQueue::new();
    for title in &titles {
        match available.iter().find(|p| &p.title == title) {
            Some(playlist) => {
                if !queue.enqueue(playlist.clone()) {
                    println!("{} '{}' is already queued", "Skipping:".yellow(), title);
                }
            }
            None => println!("{} playlist '{}' not found on server", "Skipping:".yellow(), title),
        }
    }

    if queue.is_empty() {
        anyhow::bail!("None of the requested playlists exist on the server");
    }

    println!("Downloading {} playlist(s) to {}", queue.len(), root.display());

    let engine = TransferEngine::new(client.http_client().clone());
    let downloader = PlaylistDownloader::new(Arc::new(client), engine);
    let cancel = downloader.cancel_flag();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let view = ProgressView::new(queue.len());
    let worker = tokio::spawn(async move {
        queue.run(&downloader, &root, &tx).await;
        queue
    });

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => view.handle(event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => match interrupt(&cancel) {
                Interrupt::Stop => {
                    view.println(format!("{}", "Stopping after the current chunk...".yellow()));
                    view.println("Press Ctrl-C again to quit immediately.".to_string());
                }
                Interrupt::Abort => {
                    view.println(format!("{}", "Aborted".red().bold()));
                    warn!("Download aborted by a second interrupt");
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            },
        }
    }

    let queue = worker.await.context("Download worker failed")?;
    view.finish();

    print_report(&queue);
    Ok(())
}

/// Exit status after a second Ctrl-C (128 + SIGINT)
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    /// Ask the worker to stop at the next chunk
    Stop,
    /// The worker did not stop in time; give up on it
    Abort,
}

fn interrupt(cancel: &CancelFlag) -> Interrupt {
    if cancel.is_cancelled() {
        Interrupt::Abort
    } else {
        cancel.cancel();
        Interrupt::Stop
    }
}

fn print_report(queue: &DownloadQueue) {
    println!();
    println!("{}", "Download summary".bold());
    for entry in queue.entries() {
        let status = match entry.status {
            EntryStatus::Completed => entry.status.to_string().green(),
            EntryStatus::Stopped => entry.status.to_string().yellow(),
            _ => entry.status.to_string().normal(),
        };
        println!(
            "  {:<12} {} ({} downloaded, {} remaining)",
            status,
            entry.title(),
            entry.downloaded,
            entry.remaining
        );
        if let Some(message) = &entry.message {
            println!("               {}", message);
        }
    }

    let errors: Vec<(&str, &String)> = queue
        .entries()
        .iter()
        .flat_map(|e| e.item_errors.iter().map(move |err| (e.title(), err)))
        .collect();

    if !errors.is_empty() {
        println!();
        println!("{}", format!("{} item(s) failed:", errors.len()).red().bold());
        for (playlist, error) in errors {
            println!("  [{}] {}", playlist, error);
        }
    }
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "plexpull", &mut io::stdout());
}

fn load_configured(paths: &StorePaths) -> Result<Config> {
    let config = Config::load(&paths.config_file());
    if !config.has_token() {
        anyhow::bail!("No Plex token configured. Run 'plexpull configure' first.");
    }
    Ok(config)
}

async fn connect(config: &Config) -> Result<PlexClient> {
    PlexClient::connect(
        &config.plex_address,
        &config.plex_token,
        &config.client_identifier,
        config.transfer_mode,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_interrupt_aborts() {
        let cancel = CancelFlag::new();
        assert_eq!(interrupt(&cancel), Interrupt::Stop);
        assert!(cancel.is_cancelled());
        assert_eq!(interrupt(&cancel), Interrupt::Abort);
        assert!(cancel.is_cancelled());
    }
}
