//! Plex request authentication
//!
//! Plex authenticates every request with the account token in the
//! `X-Plex-Token` header and expects each client to identify itself with a
//! stable, random client identifier.

use anyhow::{Context, Result};
use rand::Rng;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};

/// Product name announced to the server
pub const PRODUCT_NAME: &str = "plexpull";

const TOKEN_HEADER: &str = "x-plex-token";
const CLIENT_ID_HEADER: &str = "x-plex-client-identifier";
const PRODUCT_HEADER: &str = "x-plex-product";
const VERSION_HEADER: &str = "x-plex-version";

/// Generate a random client identifier (24 alphanumeric characters)
pub fn generate_client_identifier() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}

/// Build the headers sent with every request
///
/// - Accept: application/json
/// - X-Plex-Token: account token
/// - X-Plex-Client-Identifier: this installation
/// - X-Plex-Product / X-Plex-Version: this tool
pub fn plex_headers(token: &str, client_id: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static(TOKEN_HEADER),
        HeaderValue::from_str(token).context("Plex token contains invalid characters")?,
    );
    headers.insert(
        HeaderName::from_static(CLIENT_ID_HEADER),
        HeaderValue::from_str(client_id).context("Client identifier contains invalid characters")?,
    );
    headers.insert(
        HeaderName::from_static(PRODUCT_HEADER),
        HeaderValue::from_static(PRODUCT_NAME),
    );
    headers.insert(
        HeaderName::from_static(VERSION_HEADER),
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_identifier_format() {
        let id = generate_client_identifier();
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_headers_contain_all_fields() {
        let headers = plex_headers("secret", "client123").unwrap();
        assert_eq!(headers.get(TOKEN_HEADER).unwrap(), "secret");
        assert_eq!(headers.get(CLIENT_ID_HEADER).unwrap(), "client123");
        assert_eq!(headers.get(PRODUCT_HEADER).unwrap(), PRODUCT_NAME);
        assert!(headers.contains_key(VERSION_HEADER));
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn test_token_with_newline_rejected() {
        assert!(plex_headers("bad\ntoken", "client").is_err());
    }
}
