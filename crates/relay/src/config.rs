// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

/// Realtime relay between WebSocket clients and the Spotify catalog API.
#[derive(Debug, Clone, Parser)]
#[command(name = "catalog-relay", version, about)]
pub struct RelayConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "RELAY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8080, env = "RELAY_PORT")]
    pub port: u16,

    /// Bearer token for downstream API auth. If unset, auth is disabled.
    #[arg(long, env = "RELAY_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Application prefix used to namespace event names.
    #[arg(long, default_value = "HJBV", env = "RELAY_APP_PREFIX")]
    pub app_prefix: String,

    /// Service prefix used to namespace event names.
    #[arg(long, default_value = "Spotify", env = "RELAY_SERVICE_PREFIX")]
    pub service_prefix: String,

    /// Upstream OAuth client identifier.
    #[arg(long, env = "RELAY_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    /// Upstream OAuth client secret.
    #[arg(long, env = "RELAY_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Client-credentials token endpoint.
    #[arg(long, default_value = "https://accounts.spotify.com/api/token", env = "RELAY_TOKEN_URL")]
    pub token_url: String,

    /// Catalog API base URL.
    #[arg(long, default_value = "https://api.spotify.com", env = "RELAY_API_BASE")]
    pub api_base: String,

    /// Seconds before reported expiry at which the access token is renewed.
    #[arg(long, default_value_t = 10, env = "RELAY_RENEWAL_MARGIN_SECS")]
    pub renewal_margin_secs: u64,

    /// Upstream request timeout in milliseconds.
    #[arg(long, default_value_t = 10000, env = "RELAY_UPSTREAM_TIMEOUT_MS")]
    pub upstream_timeout_ms: u64,

    /// Renew and retry track/album fetches once when the upstream rejects the token.
    /// Searches always do.
    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        env = "RELAY_FETCH_RETRY_ON_EXPIRY"
    )]
    pub fetch_retry_on_expiry: bool,

    /// Log format (text or json).
    #[arg(long, default_value = "text", env = "RELAY_LOG_FORMAT")]
    pub log_format: String,

    /// Log level filter.
    #[arg(long, default_value = "info", env = "RELAY_LOG_LEVEL")]
    pub log_level: String,
}

impl RelayConfig {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.app_prefix.is_empty() || self.service_prefix.is_empty() {
            anyhow::bail!("--app-prefix and --service-prefix must be non-empty");
        }
        if self.client_id.as_deref().unwrap_or_default().is_empty()
            || self.client_secret.as_deref().unwrap_or_default().is_empty()
        {
            anyhow::bail!("--client-id and --client-secret (or RELAY_CLIENT_ID/RELAY_CLIENT_SECRET) are required");
        }
        match self.log_format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        Ok(())
    }

    pub fn renewal_margin(&self) -> Duration {
        Duration::from_secs(self.renewal_margin_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
