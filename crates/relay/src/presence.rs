// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection presence: who is connected and what they call themselves.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::RwLock;

/// Name shown for a connection that has not announced one.
pub const UNNAMED: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone)]
struct Presence {
    name: Option<String>,
    status: PresenceStatus,
}

/// Presence entry as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceInfo {
    pub id: String,
    pub name: String,
    pub status: PresenceStatus,
}

/// Connection id to presence record. Entries outlive their connection and
/// are only flipped to offline.
#[derive(Default)]
pub struct PresenceRegistry {
    entries: RwLock<HashMap<String, Presence>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn connect(&self, id: &str) {
        self.entries
            .write()
            .await
            .insert(id.to_owned(), Presence { name: None, status: PresenceStatus::Online });
    }

    /// Record the display name for a connection. Returns false for unknown ids.
    pub async fn set_name(&self, id: &str, name: &str) -> bool {
        match self.entries.write().await.get_mut(id) {
            Some(entry) => {
                entry.name = Some(name.to_owned());
                true
            }
            None => false,
        }
    }

    pub async fn disconnect(&self, id: &str) {
        if let Some(entry) = self.entries.write().await.get_mut(id) {
            entry.status = PresenceStatus::Offline;
        }
    }

    /// Whether the connection is online and has announced a name.
    pub async fn is_named(&self, id: &str) -> bool {
        self.entries
            .read()
            .await
            .get(id)
            .is_some_and(|e| e.status == PresenceStatus::Online && e.name.is_some())
    }

    pub async fn online_count(&self) -> usize {
        self.entries.read().await.values().filter(|e| e.status == PresenceStatus::Online).count()
    }

    pub async fn list(&self) -> Vec<PresenceInfo> {
        let mut list: Vec<_> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(id, e)| PresenceInfo {
                id: id.clone(),
                name: e.name.clone().unwrap_or_else(|| UNNAMED.to_owned()),
                status: e.status,
            })
            .collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }
}
