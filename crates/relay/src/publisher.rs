// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Response publisher: wraps upstream results and fans them out to every
//! connected client through the outbound hub.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::messages::{EventNames, Frame, ResponseEnvelope, Subject};
use crate::upstream::Page;

/// Capacity of the outbound hub. Slow listeners skip what they miss.
pub const HUB_CAPACITY: usize = 256;

/// A response envelope addressed to an outbound event name.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    pub event: String,
    pub envelope: Arc<ResponseEnvelope>,
}

impl OutboundFrame {
    /// Serialize as a WebSocket text frame.
    pub fn to_text(&self) -> serde_json::Result<String> {
        let frame = Frame { event: self.event.clone(), data: serde_json::to_value(&*self.envelope)? };
        serde_json::to_string(&frame)
    }
}

/// Create the outbound hub channel.
pub fn hub() -> broadcast::Sender<OutboundFrame> {
    broadcast::channel(HUB_CAPACITY).0
}

/// Broadcasts response envelopes to all listeners.
#[derive(Clone)]
pub struct ResponsePublisher {
    names: Arc<EventNames>,
    tx: broadcast::Sender<OutboundFrame>,
}

impl ResponsePublisher {
    pub fn new(names: EventNames, tx: broadcast::Sender<OutboundFrame>) -> Self {
        Self { names: Arc::new(names), tx }
    }

    /// Build the envelope for `subject` and broadcast it.
    ///
    /// Returns the number of listeners reached; zero is not an error.
    pub fn publish(&self, subject: Subject, page: Page) -> usize {
        let envelope = ResponseEnvelope { subject, page };
        let event = self.names.response(envelope.kind()).to_owned();
        tracing::debug!(event, items = envelope.page.items.len(), "broadcasting response");
        self.tx.send(OutboundFrame { event, envelope: Arc::new(envelope) }).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundFrame> {
        self.tx.subscribe()
    }
}
