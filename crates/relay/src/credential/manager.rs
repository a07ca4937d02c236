// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential manager: owns the access token and its single renewal timer.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::credential::{renewal_delay, AccessCredential, CredentialSnapshot, CredentialStatus};
use crate::error::RelayError;
use crate::upstream::CatalogApi;

/// Holds the one process-wide access credential for the catalog API.
///
/// Every successful exchange cancels the pending renewal timer (if any) and
/// arms a new one, so at most one timer is pending at a time. A failed
/// exchange leaves both the previous credential and its timer in place.
///
/// Exchanges are serialized: the token pushed to the client is always the
/// one held here.
pub struct CredentialManager<A> {
    api: Arc<A>,
    margin: Duration,
    /// Held from the start of an exchange until its token is stored.
    exchange: Mutex<()>,
    credential: RwLock<Option<AccessCredential>>,
    /// Cancellation handle of the pending renewal timer.
    timer: Mutex<Option<CancellationToken>>,
    live_timers: Arc<AtomicUsize>,
    renewals: AtomicU64,
    status_tx: watch::Sender<CredentialSnapshot>,
}

impl<A: CatalogApi> CredentialManager<A> {
    pub fn new(api: Arc<A>, margin: Duration) -> Arc<Self> {
        let (status_tx, _) = watch::channel(CredentialSnapshot::missing());
        Arc::new(Self {
            api,
            margin,
            exchange: Mutex::new(()),
            credential: RwLock::new(None),
            timer: Mutex::new(None),
            live_timers: Arc::new(AtomicUsize::new(0)),
            renewals: AtomicU64::new(0),
            status_tx,
        })
    }

    /// Exchange client credentials for a fresh token and arm its renewal.
    pub async fn acquire(self: &Arc<Self>) -> Result<AccessCredential, RelayError> {
        let _exchange = self.exchange.lock().await;
        let token = match self.api.exchange_client_credentials().await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(err = %e, "access token exchange failed");
                let expires_at = self.credential.read().await.as_ref().map(|c| c.expires_at);
                self.status_tx
                    .send_replace(CredentialSnapshot { status: CredentialStatus::Failed, expires_at });
                return Err(e);
            }
        };

        self.api.set_token(&token.access_token).await;
        let credential =
            AccessCredential::new(token.access_token, Duration::from_secs(token.expires_in));
        *self.credential.write().await = Some(credential.clone());

        let delay = renewal_delay(token.expires_in, self.margin);
        self.schedule_renewal(delay).await;

        self.status_tx.send_replace(CredentialSnapshot {
            status: CredentialStatus::Healthy,
            expires_at: Some(credential.expires_at),
        });
        tracing::info!(
            expires_in = token.expires_in,
            renew_in_secs = delay.as_secs(),
            "access token acquired"
        );
        Ok(credential)
    }

    /// Same as [`Self::acquire`]; called by the expiry timer and by handlers
    /// whose upstream call was rejected as unauthorized.
    pub async fn renew(self: &Arc<Self>) -> Result<AccessCredential, RelayError> {
        self.renewals.fetch_add(1, Ordering::Relaxed);
        self.acquire().await
    }

    /// Currently held credential, if any exchange has succeeded.
    pub async fn current(&self) -> Option<AccessCredential> {
        self.credential.read().await.clone()
    }

    /// Subscribe to credential status changes.
    pub fn subscribe(&self) -> watch::Receiver<CredentialSnapshot> {
        self.status_tx.subscribe()
    }

    /// Number of `renew()` calls so far.
    pub fn renewal_count(&self) -> u64 {
        self.renewals.load(Ordering::Relaxed)
    }

    /// Number of renewal timer tasks still running.
    pub fn live_timers(&self) -> usize {
        self.live_timers.load(Ordering::Acquire)
    }

    pub async fn has_pending_renewal(&self) -> bool {
        self.timer.lock().await.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Cancel the pending renewal timer.
    pub async fn shutdown(&self) {
        if let Some(timer) = self.timer.lock().await.take() {
            timer.cancel();
        }
    }

    async fn schedule_renewal(self: &Arc<Self>, delay: Duration) {
        let mut slot = self.timer.lock().await;
        if let Some(prev) = slot.take() {
            prev.cancel();
        }

        let cancel = CancellationToken::new();
        let guard = LiveTimer::enter(&self.live_timers);
        let manager = Arc::downgrade(self);
        let token = cancel.clone();
        tokio::spawn(async move {
            let _guard = guard;
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    // Spent; only a successful renewal arms the next one.
                    token.cancel();
                    Self::timer_fired(manager).await;
                }
            }
        });

        *slot = Some(cancel);
    }

    fn timer_fired(manager: Weak<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let Some(manager) = manager.upgrade() else {
                return;
            };
            tracing::debug!("renewal timer fired");
            // Failure is already logged by acquire(); no retry is scheduled.
            let _ = manager.renew().await;
        })
    }
}

impl<A> Drop for CredentialManager<A> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.cancel();
        }
    }
}

/// Counts a running timer task for as long as it is alive.
struct LiveTimer(Arc<AtomicUsize>);

impl LiveTimer {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for LiveTimer {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
