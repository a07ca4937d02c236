// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted in-memory catalog used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};

use crate::error::RelayError;
use crate::upstream::{CatalogApi, Page, TokenResponse, UpstreamError};

/// Records every call and answers from scripted queues.
///
/// Exchanges with nothing scripted succeed with `tok-<n>` valid for an hour.
/// Catalog calls with nothing scripted succeed with an empty page.
#[derive(Default)]
pub struct FakeCatalog {
    calls: Mutex<Vec<String>>,
    exchanges: Mutex<VecDeque<Result<TokenResponse, RelayError>>>,
    results: Mutex<VecDeque<Result<Page, UpstreamError>>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<Result<Page, UpstreamError>>>>,
    exchange_gate: Mutex<Option<oneshot::Receiver<Result<TokenResponse, RelayError>>>>,
    exchange_count: Mutex<u64>,
}

impl FakeCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn push_exchange(&self, result: Result<TokenResponse, RelayError>) {
        self.exchanges.lock().await.push_back(result);
    }

    pub async fn push_result(&self, result: Result<Page, UpstreamError>) {
        self.results.lock().await.push_back(result);
    }

    /// Hold the next call whose argument is `arg` until the returned sender fires.
    pub async fn gate(&self, arg: &str) -> oneshot::Sender<Result<Page, UpstreamError>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().await.insert(arg.to_owned(), rx);
        tx
    }

    /// Hold the next exchange until the returned sender fires.
    pub async fn gate_exchange(&self) -> oneshot::Sender<Result<TokenResponse, RelayError>> {
        let (tx, rx) = oneshot::channel();
        *self.exchange_gate.lock().await = Some(rx);
        tx
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    /// Calls to catalog operations, excluding token exchange and `set_token`.
    pub async fn catalog_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| !c.starts_with("exchange") && !c.starts_with("set_token"))
            .cloned()
            .collect()
    }

    async fn answer(&self, op: &str, arg: &str) -> Result<Page, UpstreamError> {
        self.calls.lock().await.push(format!("{op}:{arg}"));
        let gate = self.gates.lock().await.remove(arg);
        if let Some(rx) = gate {
            return rx.await.unwrap_or_else(|_| Err(UpstreamError::Transport("gate dropped".into())));
        }
        self.results.lock().await.pop_front().unwrap_or_else(|| Ok(Page::default()))
    }
}

impl CatalogApi for FakeCatalog {
    async fn exchange_client_credentials(&self) -> Result<TokenResponse, RelayError> {
        self.calls.lock().await.push("exchange".to_owned());
        let n = {
            let mut count = self.exchange_count.lock().await;
            *count += 1;
            *count
        };
        let gate = self.exchange_gate.lock().await.take();
        if let Some(rx) = gate {
            return rx.await.unwrap_or_else(|_| Err(RelayError::auth_exchange("gate dropped")));
        }
        match self.exchanges.lock().await.pop_front() {
            Some(result) => result,
            None => Ok(TokenResponse {
                access_token: format!("tok-{n}"),
                expires_in: 3600,
                token_type: Some("Bearer".to_owned()),
            }),
        }
    }

    async fn set_token(&self, token: &str) {
        self.calls.lock().await.push(format!("set_token:{token}"));
    }

    async fn search_albums(&self, query: &str) -> Result<Page, UpstreamError> {
        self.answer("search_albums", query).await
    }

    async fn search_artists(&self, query: &str) -> Result<Page, UpstreamError> {
        self.answer("search_artists", query).await
    }

    async fn search_tracks(&self, query: &str) -> Result<Page, UpstreamError> {
        self.answer("search_tracks", query).await
    }

    async fn list_album_tracks(&self, album_id: &str) -> Result<Page, UpstreamError> {
        self.answer("list_album_tracks", album_id).await
    }

    async fn list_artist_albums(&self, artist_id: &str) -> Result<Page, UpstreamError> {
        self.answer("list_artist_albums", artist_id).await
    }
}

pub fn token(access_token: &str, expires_in: u64) -> TokenResponse {
    TokenResponse { access_token: access_token.to_owned(), expires_in, token_type: None }
}

pub fn page(items: &[&str], limit: u64, total: u64, offset: u64) -> Page {
    Page {
        items: items.iter().map(|s| serde_json::json!({ "id": s })).collect(),
        limit,
        total,
        offset,
    }
}
