// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the relay.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::credential::CredentialStatus;
use crate::router::RouterStats;
use crate::state::RelayState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub connections: usize,
    pub credential: CredentialInfo,
    pub requests: RouterStats,
}

#[derive(Debug, Serialize)]
pub struct CredentialInfo {
    pub status: CredentialStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_secs: Option<u64>,
}

/// `GET /api/v1/health`
pub async fn health(State(s): State<Arc<RelayState>>) -> impl IntoResponse {
    let snapshot = s.credential.borrow().clone();
    Json(HealthResponse {
        status: "running".to_owned(),
        connections: s.presence.online_count().await,
        credential: CredentialInfo {
            status: snapshot.status,
            expires_in_secs: snapshot.expires_in_secs(),
        },
        requests: s.dispatcher.stats(),
    })
}

/// `GET /api/v1/presence`
pub async fn presence(State(s): State<Arc<RelayState>>) -> impl IntoResponse {
    Json(s.presence.list().await)
}
