// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the Spotify Web API.

use std::sync::Once;
use std::time::Duration;

use reqwest::{Client, Url};
use tokio::sync::RwLock;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::upstream::{CatalogApi, Page, TokenResponse, UpstreamError};

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// HTTP client wrapper for the catalog API and its token endpoint.
pub struct SpotifyClient {
    api_base: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    access_token: RwLock<Option<String>>,
    client: Client,
}

impl SpotifyClient {
    pub fn new(
        api_base: String,
        token_url: String,
        client_id: String,
        client_secret: String,
        timeout: Duration,
    ) -> Self {
        ensure_crypto();
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();
        Self {
            api_base: api_base.trim_end_matches('/').to_owned(),
            token_url,
            client_id,
            client_secret,
            access_token: RwLock::new(None),
            client,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            config.api_base.clone(),
            config.token_url.clone(),
            config.client_id.clone().unwrap_or_default(),
            config.client_secret.clone().unwrap_or_default(),
            config.upstream_timeout(),
        )
    }

    /// Build `{api_base}/v1/<segments>` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| UpstreamError::Transport(format!("invalid api base: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| UpstreamError::Transport("api base cannot carry a path".to_owned()))?
            .pop_if_empty()
            .push("v1")
            .extend(segments);
        Ok(url)
    }

    async fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.access_token.read().await.as_deref() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// GET a catalog endpoint and return the JSON body.
    async fn get_json(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, UpstreamError> {
        let req = self.client.get(url).query(query);
        let resp = self.apply_auth(req).await.send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            let body = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::Unauthorized(body));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::Status { status: status.as_u16(), body });
        }
        Ok(resp.json().await?)
    }

    /// Run a search of one type and unwrap its paging container
    /// (`{"albums": {...}}`, `{"artists": {...}}` or `{"tracks": {...}}`).
    async fn search(&self, kind: &str, query: &str) -> Result<Page, UpstreamError> {
        let url = self.url(&["search"])?;
        let mut body = self.get_json(url, &[("q", query), ("type", kind)]).await?;
        let container = body
            .get_mut(format!("{kind}s"))
            .map(serde_json::Value::take)
            .ok_or_else(|| UpstreamError::Decode(format!("missing `{kind}s` container")))?;
        parse_page(container)
    }

    async fn get_page(&self, segments: &[&str]) -> Result<Page, UpstreamError> {
        let url = self.url(segments)?;
        let body = self.get_json(url, &[]).await?;
        parse_page(body)
    }
}

fn parse_page(value: serde_json::Value) -> Result<Page, UpstreamError> {
    serde_json::from_value(value).map_err(|e| UpstreamError::Decode(e.to_string()))
}

impl CatalogApi for SpotifyClient {
    async fn exchange_client_credentials(&self) -> Result<TokenResponse, RelayError> {
        let resp = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| RelayError::auth_exchange(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(RelayError::auth_exchange(format!("token exchange failed ({status}): {text}")));
        }

        resp.json::<TokenResponse>().await.map_err(|e| RelayError::auth_exchange(e.to_string()))
    }

    async fn set_token(&self, token: &str) {
        *self.access_token.write().await = Some(token.to_owned());
    }

    async fn search_albums(&self, query: &str) -> Result<Page, UpstreamError> {
        self.search("album", query).await
    }

    async fn search_artists(&self, query: &str) -> Result<Page, UpstreamError> {
        self.search("artist", query).await
    }

    async fn search_tracks(&self, query: &str) -> Result<Page, UpstreamError> {
        self.search("track", query).await
    }

    async fn list_album_tracks(&self, album_id: &str) -> Result<Page, UpstreamError> {
        self.get_page(&["albums", album_id, "tracks"]).await
    }

    async fn list_artist_albums(&self, artist_id: &str) -> Result<Page, UpstreamError> {
        self.get_page(&["artists", artist_id, "albums"]).await
    }
}
