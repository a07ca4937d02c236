// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for the relay.
///
/// The first four classify request-handling failures; they never reach a
/// connected client and are surfaced through logs only. `Unauthorized` is
/// returned by the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The client-credentials exchange itself failed.
    AuthExchangeFailed,
    /// The upstream rejected a call because the access token is stale.
    AuthExpired,
    /// Any other upstream failure.
    UpstreamRequestFailed,
    /// Unrecognized request tag or payload shape.
    MalformedRequest,
    Unauthorized,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::AuthExchangeFailed | Self::AuthExpired | Self::UpstreamRequestFailed => 502,
            Self::MalformedRequest => 400,
            Self::Unauthorized => 401,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthExchangeFailed => "AUTH_EXCHANGE_FAILED",
            Self::AuthExpired => "AUTH_EXPIRED",
            Self::UpstreamRequestFailed => "UPSTREAM_REQUEST_FAILED",
            Self::MalformedRequest => "MALFORMED_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
        }
    }

    pub fn to_error_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody { code: self.as_str().to_owned(), message: message.into() }
    }

    pub fn to_http_response(
        &self,
        message: impl Into<String>,
    ) -> (StatusCode, Json<ErrorResponse>) {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse { error: self.to_error_body(message) };
        (status, Json(body))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified relay failure with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayError {
    pub code: ErrorCode,
    pub message: String,
}

impl RelayError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn auth_exchange(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthExchangeFailed, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedRequest, message)
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for RelayError {}

/// Top-level error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}
