// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::credential::CredentialSnapshot;
use crate::messages::EventNames;
use crate::presence::PresenceRegistry;
use crate::publisher::OutboundFrame;
use crate::router::Dispatch;

/// Shared relay state handed to every transport handler.
pub struct RelayState {
    pub config: RelayConfig,
    pub names: EventNames,
    pub shutdown: CancellationToken,
    pub presence: PresenceRegistry,
    /// Outbound hub; every WebSocket connection subscribes to it.
    pub hub: broadcast::Sender<OutboundFrame>,
    pub dispatcher: Arc<dyn Dispatch>,
    pub credential: watch::Receiver<CredentialSnapshot>,
}

impl RelayState {
    pub fn new(
        config: RelayConfig,
        shutdown: CancellationToken,
        hub: broadcast::Sender<OutboundFrame>,
        dispatcher: Arc<dyn Dispatch>,
        credential: watch::Receiver<CredentialSnapshot>,
    ) -> Self {
        let names = EventNames::new(&config.app_prefix, &config.service_prefix);
        Self {
            config,
            names,
            shutdown,
            presence: PresenceRegistry::new(),
            hub,
            dispatcher,
            credential,
        }
    }
}
