//! GitHub gist client used as the remote snapshot store.
//!
//! The snapshot lives in a single private gist as the file `pedidos.json`.
//!
//! # API Reference
//!
//! - Base URL: `https://api.github.com`
//! - Authentication: `Authorization: Bearer <token>` (needs the `gist` scope)
//! - API Version: `2022-11-28` (specified via `X-GitHub-Api-Version` header)

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use bakery_core::{LocalStatus, Snapshot};

/// File name of the snapshot inside the gist.
pub const GIST_FILENAME: &str = "pedidos.json";

/// Description given to gists this client creates.
pub const GIST_DESCRIPTION: &str = "Datos de Pedidos - Panadería";

/// GitHub REST API version header value.
const API_VERSION: &str = "2022-11-28";

/// Default API base URL.
const BASE_URL: &str = "https://api.github.com";

/// Snapshot type exchanged with the remote.
pub type LocalSnapshot = Snapshot<LocalStatus>;

/// Errors that can occur when talking to the remote.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The token was rejected (401).
    #[error("Unauthorized: invalid or expired token")]
    Unauthorized,

    /// The token lacks a required scope (403).
    #[error("Forbidden: token is missing the gist scope")]
    Forbidden,

    /// The gist does not exist (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response or the snapshot could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The client could not be built.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RemoteError {
    /// Whether the remote rejected the credentials.
    #[must_use]
    pub const fn is_credentials(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Forbidden)
    }

    /// Whether the remote reported the resource missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Remote holding the shared snapshot.
///
/// Implemented by [`GistClient`]; tests substitute an in-memory fake.
pub trait SnapshotStore: Send + Sync {
    /// Fetch the snapshot stored in `gist_id`.
    fn fetch(&self, gist_id: &str) -> impl Future<Output = Result<LocalSnapshot, RemoteError>> + Send;

    /// Store `snapshot` in a new private gist and return its id.
    fn create(
        &self,
        snapshot: &LocalSnapshot,
    ) -> impl Future<Output = Result<String, RemoteError>> + Send;

    /// Overwrite the snapshot stored in `gist_id`.
    fn update(
        &self,
        gist_id: &str,
        snapshot: &LocalSnapshot,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Check the credentials and return the account name.
    fn verify(&self) -> impl Future<Output = Result<String, RemoteError>> + Send;
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct GistWrite<'a> {
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    public: Option<bool>,
    files: HashMap<&'a str, GistFileWrite>,
}

#[derive(Debug, Serialize)]
struct GistFileWrite {
    content: String,
}

#[derive(Debug, Deserialize)]
struct GistRead {
    id: String,
    #[serde(default)]
    files: HashMap<String, GistFileRead>,
}

#[derive(Debug, Deserialize)]
struct GistFileRead {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

// =============================================================================
// Client
// =============================================================================

/// GitHub gist API client.
#[derive(Clone)]
pub struct GistClient {
    inner: Arc<GistClientInner>,
}

struct GistClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl GistClient {
    /// Create a client for the public GitHub API.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(token: &SecretString) -> Result<Self, RemoteError> {
        let base_url =
            Url::parse(BASE_URL).map_err(|e| RemoteError::Config(format!("invalid base URL: {e}")))?;
        Self::with_base_url(token, base_url)
    }

    /// Create a client against a different API root (GitHub Enterprise, test servers).
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn with_base_url(token: &SecretString, base_url: Url) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| RemoteError::Config(format!("Invalid token format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("bakery-orders/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(GistClientInner { client, base_url }),
        })
    }

    fn url(&self, path: &str) -> Result<Url, RemoteError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| RemoteError::Config(format!("invalid path {path}: {e}")))
    }

    /// Handle API response and parse JSON.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RemoteError> {
        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| RemoteError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(Self::parse_error(response).await)
    }

    /// Map an error response to a [`RemoteError`].
    async fn parse_error(response: reqwest::Response) -> RemoteError {
        let status = response.status().as_u16();
        match status {
            401 => RemoteError::Unauthorized,
            403 => RemoteError::Forbidden,
            404 => RemoteError::NotFound("gist not found".to_string()),
            _ => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                tracing::error!(status, %message, "GitHub API error");
                RemoteError::Api { status, message }
            }
        }
    }

    fn write_body(snapshot: &LocalSnapshot, public: Option<bool>) -> Result<GistWrite<'static>, RemoteError> {
        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| RemoteError::Parse(format!("Failed to encode snapshot: {e}")))?;
        Ok(GistWrite {
            description: GIST_DESCRIPTION,
            public,
            files: HashMap::from([(GIST_FILENAME, GistFileWrite { content })]),
        })
    }

    /// Extract the snapshot text, following `raw_url` for truncated files.
    async fn snapshot_content(&self, gist: GistRead) -> Result<String, RemoteError> {
        let file = gist.files.into_iter().find_map(|(name, file)| {
            (name == GIST_FILENAME).then_some(file)
        });
        let Some(file) = file else {
            return Err(RemoteError::Parse(format!(
                "gist {} has no {GIST_FILENAME}",
                gist.id
            )));
        };

        match (file.truncated, file.raw_url, file.content) {
            (true, Some(raw_url), _) => {
                tracing::debug!(%raw_url, "Snapshot truncated, fetching raw file");
                let response = self.inner.client.get(&raw_url).send().await?;
                if !response.status().is_success() {
                    return Err(Self::parse_error(response).await);
                }
                Ok(response.text().await?)
            }
            (_, _, Some(content)) => Ok(content),
            _ => Err(RemoteError::Parse(format!("{GIST_FILENAME} has no content"))),
        }
    }
}

impl SnapshotStore for GistClient {
    #[instrument(skip(self))]
    async fn fetch(&self, gist_id: &str) -> Result<LocalSnapshot, RemoteError> {
        let url = self.url(&format!("gists/{gist_id}"))?;
        let response = self.inner.client.get(url).send().await?;
        let gist: GistRead = Self::handle_response(response).await?;

        let content = self.snapshot_content(gist).await?;
        let snapshot: LocalSnapshot = serde_json::from_str(&content)
            .map_err(|e| RemoteError::Parse(format!("Invalid snapshot: {e}")))?;

        tracing::debug!(orders = snapshot.orders.len(), "Snapshot fetched");
        Ok(snapshot)
    }

    #[instrument(skip(self, snapshot), fields(orders = snapshot.orders.len()))]
    async fn create(&self, snapshot: &LocalSnapshot) -> Result<String, RemoteError> {
        let body = Self::write_body(snapshot, Some(false))?;
        let url = self.url("gists")?;
        let response = self.inner.client.post(url).json(&body).send().await?;
        let gist: GistRead = Self::handle_response(response).await?;

        tracing::info!(gist_id = %gist.id, "Gist created");
        Ok(gist.id)
    }

    #[instrument(skip(self, snapshot), fields(orders = snapshot.orders.len()))]
    async fn update(&self, gist_id: &str, snapshot: &LocalSnapshot) -> Result<(), RemoteError> {
        let body = Self::write_body(snapshot, None)?;
        let url = self.url(&format!("gists/{gist_id}"))?;
        let response = self.inner.client.patch(url).json(&body).send().await?;
        let _: GistRead = Self::handle_response(response).await?;

        tracing::debug!("Gist updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn verify(&self) -> Result<String, RemoteError> {
        let url = self.url("user")?;
        let response = self.inner.client.get(url).send().await?;
        let user: GitHubUser = Self::handle_response(response).await?;
        Ok(user.login)
    }
}

impl std::fmt::Debug for GistClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GistClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bakery_core::{Order, OrderId};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_api_constants() {
        assert_eq!(BASE_URL, "https://api.github.com");
        assert_eq!(GIST_FILENAME, "pedidos.json");
        assert!(!API_VERSION.is_empty());
    }

    #[test]
    fn test_write_body_shape() {
        let ts = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
        let snapshot = Snapshot::new(
            vec![Order {
                id: OrderId::new("k1"),
                customer_name: "Inés".to_owned(),
                customer_phone: None,
                delivery_date: "2026-02-02".to_owned(),
                delivery_time: "07:30".to_owned(),
                items: Vec::new(),
                notes: None,
                total_amount: None,
                status: LocalStatus::Pendiente,
                created_at: ts,
                updated_at: ts,
            }],
            ts,
        );

        let body = serde_json::to_value(GistClient::write_body(&snapshot, Some(false)).unwrap())
            .unwrap();
        assert_eq!(body["description"], GIST_DESCRIPTION);
        assert_eq!(body["public"], false);

        let content = body["files"][GIST_FILENAME]["content"].as_str().unwrap();
        let decoded: LocalSnapshot = serde_json::from_str(content).unwrap();
        assert_eq!(decoded, snapshot);

        let update = serde_json::to_value(GistClient::write_body(&snapshot, None).unwrap()).unwrap();
        assert!(update.get("public").is_none());
    }

    #[test]
    fn test_gist_read_parses_files() {
        let gist: GistRead = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "files": {
                "pedidos.json": {
                    "content": "{\"orders\":[],\"lastSync\":null}",
                    "truncated": false,
                    "raw_url": "https://gist.githubusercontent.com/raw/pedidos.json"
                }
            }
        }))
        .unwrap();
        assert_eq!(gist.id, "abc");
        assert!(gist.files.contains_key(GIST_FILENAME));
    }

    #[test]
    fn test_error_classification() {
        assert!(RemoteError::Unauthorized.is_credentials());
        assert!(RemoteError::Forbidden.is_credentials());
        assert!(RemoteError::NotFound("x".into()).is_not_found());
        assert!(!RemoteError::Api {
            status: 500,
            message: String::new()
        }
        .is_credentials());
    }

    #[test]
    fn test_debug_hides_token() {
        let client = GistClient::new(&SecretString::from("ghp_topsecret")).unwrap();
        let debug_output = format!("{client:?}");
        assert!(!debug_output.contains("ghp_topsecret"));
    }
}
