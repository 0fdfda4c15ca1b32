//! Plex Media Server HTTP client

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::ValueEnum;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::auth::{PRODUCT_NAME, plex_headers};
use super::models::{
    ItemMetadata, MetadataContainer, PlaylistMetadata, PlexResponse, ServerIdentity,
};
use super::session::{MediaItem, MediaPart, MediaServer, PlaylistHandle};
use crate::download::TransferSource;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How part bytes are obtained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Copy from the server's file path when it is reachable here, else stream
    #[default]
    Auto,
    /// Always copy from the server's file path
    Local,
    /// Always stream over HTTP
    Http,
}

/// HTTP client for one Plex server
#[derive(Clone)]
pub struct PlexClient {
    base_url: String,
    headers: HeaderMap,
    mode: TransferMode,
    http_client: Client,
    server_name: String,
}

impl PlexClient {
    /// Connect to a server and confirm the token is accepted
    pub async fn connect(
        address: &str,
        token: &str,
        client_id: &str,
        mode: TransferMode,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(format!("{}/{}", PRODUCT_NAME, env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Self::connect_with(http_client, address, token, client_id, mode).await
    }

    async fn connect_with(
        http_client: Client,
        address: &str,
        token: &str,
        client_id: &str,
        mode: TransferMode,
    ) -> Result<Self> {
        let base_url = normalize_address(address)?;
        let headers = plex_headers(token, client_id)?;

        let mut client = Self {
            base_url,
            headers,
            mode,
            http_client,
            server_name: String::new(),
        };

        let identity: ServerIdentity = client.get_json("/").await?;
        client.server_name = identity
            .friendly_name
            .unwrap_or_else(|| client.base_url.clone());

        debug!(
            "Connected to {} (version {})",
            client.server_name,
            identity.version.as_deref().unwrap_or("unknown")
        );
        Ok(client)
    }

    /// Friendly name reported by the server
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Client for tuning the transfer engine's HTTP requests
    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .await
            .with_context(|| format!("Failed to connect to Plex server at {}", self.base_url))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => anyhow::bail!("Unauthorized: invalid Plex token"),
            status if !status.is_success() => {
                anyhow::bail!("Plex server returned HTTP {} for {}", status, path)
            }
            _ => {}
        }

        let body: PlexResponse<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))?;
        Ok(body.media_container)
    }
}

#[async_trait]
impl MediaServer for PlexClient {
    async fn playlists(&self) -> Result<Vec<PlaylistHandle>> {
        let container: MetadataContainer<PlaylistMetadata> = self
            .get_json("/playlists")
            .await
            .context("Failed to fetch playlists")?;

        debug!("Found {} playlists", container.metadata.len());
        Ok(container.metadata.into_iter().map(Into::into).collect())
    }

    async fn playlist_items(&self, playlist: &PlaylistHandle) -> Result<Vec<MediaItem>> {
        let path = format!("/playlists/{}/items", playlist.rating_key);
        let container: MetadataContainer<ItemMetadata> = self
            .get_json(&path)
            .await
            .with_context(|| format!("Failed to fetch items for playlist '{}'", playlist.title))?;

        debug!(
            "Playlist '{}' has {} items",
            playlist.title,
            container.metadata.len()
        );
        Ok(container.metadata.into_iter().map(Into::into).collect())
    }

    fn source_for(&self, part: &MediaPart) -> TransferSource {
        choose_source(self.mode, part, &self.base_url, &self.headers)
    }
}

/// Pick where a part is read from under the given mode
fn choose_source(
    mode: TransferMode,
    part: &MediaPart,
    base_url: &str,
    headers: &HeaderMap,
) -> TransferSource {
    let local = part.file.as_deref().map(PathBuf::from);
    let http = || TransferSource::Http {
        url: format!("{}{}", base_url, part.key),
        headers: headers.clone(),
    };

    match (mode, local) {
        (TransferMode::Local, Some(path)) => TransferSource::Local(path),
        (TransferMode::Auto, Some(path)) if is_reachable(&path) => TransferSource::Local(path),
        _ => http(),
    }
}

fn is_reachable(path: &Path) -> bool {
    path.is_file()
}

/// Validate a server address and strip the trailing slash
pub fn normalize_address(address: &str) -> Result<String> {
    let trimmed = address.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let url = Url::parse(&with_scheme)
        .with_context(|| format!("Invalid Plex server address: {}", address))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("Unsupported scheme in Plex server address: {}", url.scheme());
    }

    Ok(with_scheme.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn part(file: Option<&str>) -> MediaPart {
        MediaPart {
            key: "/library/parts/9/123/file.flac".to_string(),
            size: Some(10),
            file: file.map(str::to_string),
        }
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("http://nas:32400/").unwrap(), "http://nas:32400");
        assert_eq!(normalize_address("nas:32400").unwrap(), "http://nas:32400");
        assert!(normalize_address("ftp://nas").is_err());
    }

    #[test]
    fn test_http_mode_always_streams() {
        let headers = plex_headers("tok", "cid").unwrap();
        let source = choose_source(
            TransferMode::Http,
            &part(Some("/etc/hostname")),
            "http://nas:32400",
            &headers,
        );
        match source {
            TransferSource::Http { url, headers } => {
                assert_eq!(url, "http://nas:32400/library/parts/9/123/file.flac");
                assert_eq!(headers.get("x-plex-token").unwrap(), "tok");
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_auto_mode_prefers_reachable_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("song.flac");
        std::fs::write(&file, b"x").unwrap();
        let headers = HeaderMap::new();

        let local = choose_source(TransferMode::Auto, &part(file.to_str()), "http://s", &headers);
        assert!(matches!(local, TransferSource::Local(p) if p == file));

        let missing = dir.path().join("gone.flac");
        let remote =
            choose_source(TransferMode::Auto, &part(missing.to_str()), "http://s", &headers);
        assert!(matches!(remote, TransferSource::Http { .. }));

        let forced =
            choose_source(TransferMode::Local, &part(missing.to_str()), "http://s", &headers);
        assert!(matches!(forced, TransferSource::Local(p) if p == missing));

        let no_file = choose_source(TransferMode::Local, &part(None), "http://s", &headers);
        assert!(matches!(no_file, TransferSource::Http { .. }));
    }

    fn local_client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    /// Answer every request on a loopback port with a fixed status and body
    async fn serve(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_connect_reads_friendly_name() {
        let address = serve(
            "200 OK",
            r#"{"MediaContainer":{"friendlyName":"Basement","version":"1.40.0"}}"#,
        )
        .await;
        let client =
            PlexClient::connect_with(local_client(), &address, "tok", "cid", TransferMode::Http)
                .await
                .unwrap();
        assert_eq!(client.server_name(), "Basement");
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_token() {
        let address = serve("401 Unauthorized", "{}").await;
        let err =
            PlexClient::connect_with(local_client(), &address, "bad", "cid", TransferMode::Auto)
                .await
                .err()
                .unwrap();
        assert_eq!(err.to_string(), "Unauthorized: invalid Plex token");
    }
}
