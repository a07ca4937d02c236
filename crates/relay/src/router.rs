// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request router: decodes inbound envelopes and runs each one as its own
//! task against the catalog.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::credential::manager::CredentialManager;
use crate::messages::{RequestEnvelope, RequestKind, SearchCategory, Subject};
use crate::publisher::ResponsePublisher;
use crate::upstream::{CatalogApi, Page, UpstreamError};

/// Entry point used by the transport; hides the catalog type.
pub trait Dispatch: Send + Sync + 'static {
    /// Decode `payload` and spawn its handler. Malformed payloads are dropped
    /// and return `None`.
    fn dispatch_value(&self, payload: &serde_json::Value) -> Option<JoinHandle<()>>;

    fn stats(&self) -> RouterStats;
}

/// Outcome counters, for the health endpoint and tests.
#[derive(Debug, Default)]
struct Counters {
    published: AtomicU64,
    auth_expired: AtomicU64,
    upstream_failed: AtomicU64,
    malformed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouterStats {
    pub published: u64,
    /// Requests abandoned because the token was still rejected after renewal
    /// (or retry was disabled for that kind).
    pub auth_expired: u64,
    pub upstream_failed: u64,
    pub malformed: u64,
}

/// Routes requests to the catalog and publishes the results.
pub struct RequestRouter<A> {
    api: Arc<A>,
    credentials: Arc<CredentialManager<A>>,
    publisher: ResponsePublisher,
    fetch_retry_on_expiry: bool,
    counters: Arc<Counters>,
}

impl<A> Clone for RequestRouter<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            credentials: Arc::clone(&self.credentials),
            publisher: self.publisher.clone(),
            fetch_retry_on_expiry: self.fetch_retry_on_expiry,
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<A: CatalogApi> RequestRouter<A> {
    pub fn new(
        api: Arc<A>,
        credentials: Arc<CredentialManager<A>>,
        publisher: ResponsePublisher,
        fetch_retry_on_expiry: bool,
    ) -> Self {
        Self {
            api,
            credentials,
            publisher,
            fetch_retry_on_expiry,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Spawn the handler for `envelope`. Handlers run concurrently and
    /// publish in completion order.
    pub fn dispatch(&self, envelope: RequestEnvelope) -> JoinHandle<()> {
        let router = self.clone();
        tokio::spawn(async move {
            match envelope {
                RequestEnvelope::Search { category, query } => {
                    router.handle_search(category, &query).await;
                }
                RequestEnvelope::TrackFetch { album_id } => {
                    router.handle_track_fetch(&album_id).await;
                }
                RequestEnvelope::AlbumFetch { artist_id } => {
                    router.handle_album_fetch(&artist_id).await;
                }
            }
        })
    }

    pub async fn handle_search(&self, category: SearchCategory, query: &str) {
        tracing::debug!(category = category.as_str(), query, "search request");
        let mut result = self.search_once(category, query).await;
        if self.renew_if_rejected(RequestKind::Search, true, &result).await {
            result = self.search_once(category, query).await;
        }
        self.finish(RequestKind::Search, Subject::Category(category), result);
    }

    pub async fn handle_track_fetch(&self, album_id: &str) {
        tracing::debug!(album_id, "track fetch request");
        let kind = RequestKind::TrackFetch;
        let mut result = self.api.list_album_tracks(album_id).await;
        if self.renew_if_rejected(kind, self.fetch_retry_on_expiry, &result).await {
            result = self.api.list_album_tracks(album_id).await;
        }
        self.finish(kind, Subject::Album(album_id.to_owned()), result);
    }

    pub async fn handle_album_fetch(&self, artist_id: &str) {
        tracing::debug!(artist_id, "album fetch request");
        let kind = RequestKind::AlbumFetch;
        let mut result = self.api.list_artist_albums(artist_id).await;
        if self.renew_if_rejected(kind, self.fetch_retry_on_expiry, &result).await {
            result = self.api.list_artist_albums(artist_id).await;
        }
        self.finish(kind, Subject::Artist(artist_id.to_owned()), result);
    }

    async fn search_once(&self, category: SearchCategory, query: &str) -> Result<Page, UpstreamError> {
        match category {
            SearchCategory::Album => self.api.search_albums(query).await,
            SearchCategory::Artist => self.api.search_artists(query).await,
            SearchCategory::Track | SearchCategory::Unrecognized(_) => {
                self.api.search_tracks(query).await
            }
        }
    }

    /// Renew the token if `result` is an authorization failure and `retry`
    /// allows it. Returns true when the caller should re-issue its request,
    /// which it does exactly once.
    async fn renew_if_rejected(
        &self,
        kind: RequestKind,
        retry: bool,
        result: &Result<Page, UpstreamError>,
    ) -> bool {
        let Err(e) = result else {
            return false;
        };
        if !retry || !e.is_auth_expired() {
            return false;
        }
        tracing::info!(kind = kind.as_str(), err = %e, "access token rejected, renewing");
        if let Err(re) = self.credentials.renew().await {
            tracing::warn!(kind = kind.as_str(), err = %re, "renewal failed, retrying anyway");
        }
        true
    }

    fn finish(&self, kind: RequestKind, subject: Subject, result: Result<Page, UpstreamError>) {
        match result {
            Ok(page) => {
                self.counters.published.fetch_add(1, Ordering::Relaxed);
                let listeners = self.publisher.publish(subject, page);
                tracing::debug!(kind = kind.as_str(), listeners, "request completed");
            }
            Err(e) => {
                let counter = if e.is_auth_expired() {
                    &self.counters.auth_expired
                } else {
                    &self.counters.upstream_failed
                };
                counter.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(kind = kind.as_str(), code = %e.code(), err = %e, "request failed");
            }
        }
    }
}

impl<A: CatalogApi> Dispatch for RequestRouter<A> {
    fn dispatch_value(&self, payload: &serde_json::Value) -> Option<JoinHandle<()>> {
        match RequestEnvelope::decode(payload) {
            Ok(envelope) => Some(self.dispatch(envelope)),
            Err(e) => {
                self.counters.malformed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(err = %e, "dropping malformed request");
                None
            }
        }
    }

    fn stats(&self) -> RouterStats {
        RouterStats {
            published: self.counters.published.load(Ordering::Relaxed),
            auth_expired: self.counters.auth_expired.load(Ordering::Relaxed),
            upstream_failed: self.counters.upstream_failed.load(Ordering::Relaxed),
            malformed: self.counters.malformed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
