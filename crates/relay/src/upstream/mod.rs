// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upstream catalog communication: the capability trait and the Spotify client.

pub mod client;

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, RelayError};

/// One page of catalog objects, as returned by every list/search operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub offset: u64,
}

/// Standard OAuth2 client-credentials token response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// Failure of a catalog call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// HTTP 401: the access token is missing, invalid or expired.
    Unauthorized(String),
    /// Any other non-success status.
    Status { status: u16, body: String },
    /// Connection, timeout or TLS failure.
    Transport(String),
    /// The response body did not have the expected shape.
    Decode(String),
}

impl UpstreamError {
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    pub fn code(&self) -> ErrorCode {
        if self.is_auth_expired() {
            ErrorCode::AuthExpired
        } else {
            ErrorCode::UpstreamRequestFailed
        }
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized(body) => write!(f, "unauthorized (401): {body}"),
            Self::Status { status, body } => write!(f, "upstream returned {status}: {body}"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Decode(e) => write!(f, "unexpected response body: {e}"),
        }
    }
}

impl std::error::Error for UpstreamError {}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Catalog operations the relay consumes.
///
/// Implementations hold the current access token themselves; the credential
/// manager pushes fresh tokens in through [`CatalogApi::set_token`].
pub trait CatalogApi: Send + Sync + 'static {
    /// Run the client-credentials exchange.
    fn exchange_client_credentials(
        &self,
    ) -> impl Future<Output = Result<TokenResponse, RelayError>> + Send;

    /// Replace the token used for subsequent catalog calls.
    fn set_token(&self, token: &str) -> impl Future<Output = ()> + Send;

    fn search_albums(&self, query: &str)
        -> impl Future<Output = Result<Page, UpstreamError>> + Send;

    fn search_artists(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Page, UpstreamError>> + Send;

    fn search_tracks(&self, query: &str)
        -> impl Future<Output = Result<Page, UpstreamError>> + Send;

    /// List the tracks of an album.
    fn list_album_tracks(
        &self,
        album_id: &str,
    ) -> impl Future<Output = Result<Page, UpstreamError>> + Send;

    /// List the albums of an artist.
    fn list_artist_albums(
        &self,
        artist_id: &str,
    ) -> impl Future<Output = Result<Page, UpstreamError>> + Send;
}
