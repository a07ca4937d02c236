// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog relay: forwards catalog lookups from WebSocket clients to the
//! Spotify Web API and broadcasts the results to every connected client.

pub mod config;
pub mod credential;
pub mod error;
pub mod messages;
pub mod presence;
pub mod publisher;
pub mod router;
pub mod state;
pub mod transport;
pub mod upstream;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::credential::manager::CredentialManager;
use crate::messages::EventNames;
use crate::publisher::ResponsePublisher;
use crate::router::RequestRouter;
use crate::state::RelayState;
use crate::transport::build_router;
use crate::upstream::client::SpotifyClient;
use crate::upstream::CatalogApi;

/// The wired-up core: credential manager, router and shared transport state.
pub struct Relay<A> {
    pub state: Arc<RelayState>,
    pub credentials: Arc<CredentialManager<A>>,
    pub router: RequestRouter<A>,
}

impl<A: CatalogApi> Relay<A> {
    pub fn new(config: RelayConfig, api: Arc<A>, shutdown: CancellationToken) -> Self {
        let credentials = CredentialManager::new(Arc::clone(&api), config.renewal_margin());
        let hub = publisher::hub();
        let publisher = ResponsePublisher::new(
            EventNames::new(&config.app_prefix, &config.service_prefix),
            hub.clone(),
        );
        let router =
            RequestRouter::new(api, Arc::clone(&credentials), publisher, config.fetch_retry_on_expiry);
        let state = Arc::new(RelayState::new(
            config,
            shutdown,
            hub,
            Arc::new(router.clone()),
            credentials.subscribe(),
        ));
        Self { state, credentials, router }
    }
}

/// Run the relay until shutdown.
pub async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let api = Arc::new(SpotifyClient::from_config(&config));
    let relay = Relay::new(config, api, shutdown.clone());

    // A failed first exchange is not fatal: the first 401 triggers another.
    if let Err(e) = relay.credentials.acquire().await {
        tracing::warn!(err = %e, "starting without an access token");
    }

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
            }
            shutdown.cancel();
        });
    }

    let names = &relay.state.names;
    tracing::info!(inbound = %names.request, "catalog relay listening on {addr}");

    let router = build_router(Arc::clone(&relay.state));
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    relay.credentials.shutdown().await;
    Ok(())
}
