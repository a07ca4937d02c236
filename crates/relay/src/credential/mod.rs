// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upstream access-token lifecycle.
//!
//! A single client-credentials token is held in memory, renewed shortly before
//! it expires and re-fetched on demand when the catalog rejects it. Nothing is
//! persisted; a restarted relay fetches a new token at startup.

pub mod manager;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// An access token and the instant it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCredential {
    pub token: String,
    pub expires_at: Instant,
}

impl AccessCredential {
    pub fn new(token: String, lifetime: Duration) -> Self {
        Self { token, expires_at: Instant::now() + lifetime }
    }
}

/// Health of the credential slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    /// No exchange has completed yet.
    Missing,
    Healthy,
    /// The most recent exchange failed.
    Failed,
}

/// Published on every exchange attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSnapshot {
    pub status: CredentialStatus,
    pub expires_at: Option<Instant>,
}

impl CredentialSnapshot {
    pub fn missing() -> Self {
        Self { status: CredentialStatus::Missing, expires_at: None }
    }

    /// Whole seconds until the held token expires, if it has not already.
    pub fn expires_in_secs(&self) -> Option<u64> {
        let remaining = self.expires_at?.checked_duration_since(Instant::now())?;
        Some(remaining.as_secs())
    }
}

/// Delay before renewing a token that lives for `expires_in_secs`.
///
/// Never shorter than one second, so a tiny reported lifetime cannot spin.
pub fn renewal_delay(expires_in_secs: u64, margin: Duration) -> Duration {
    Duration::from_secs(expires_in_secs).saturating_sub(margin).max(Duration::from_secs(1))
}
