// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response envelopes and the event names they travel under.
//!
//! Both envelopes share one wire shape: `{"type": <integer tag>, "value": {...}}`.
//! Requests are decoded leniently where the catalog allows it (an unknown
//! search category searches tracks and is echoed back as sent), and strictly
//! everywhere else.

use serde::{Deserialize, Serialize, Serializer};

use crate::error::RelayError;
use crate::upstream::Page;

// -- Tags ----------------------------------------------------------------------

/// What a search looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchCategory {
    Album,
    Artist,
    Track,
    /// A tag outside the known set. Searched as tracks; the tag itself is
    /// echoed in the response.
    Unrecognized(u64),
}

impl SearchCategory {
    pub fn tag(self) -> u64 {
        match self {
            Self::Album => 0,
            Self::Artist => 1,
            Self::Track => 2,
            Self::Unrecognized(tag) => tag,
        }
    }

    /// A missing tag means track search.
    pub fn from_tag(tag: Option<u64>) -> Self {
        match tag {
            Some(0) => Self::Album,
            Some(1) => Self::Artist,
            Some(2) | None => Self::Track,
            Some(other) => Self::Unrecognized(other),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::Artist => "artist",
            Self::Track | Self::Unrecognized(_) => "track",
        }
    }
}

/// The three supported request kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Search,
    TrackFetch,
    AlbumFetch,
}

impl RequestKind {
    pub fn tag(self) -> u64 {
        match self {
            Self::Search => 0,
            Self::TrackFetch => 1,
            Self::AlbumFetch => 2,
        }
    }

    pub fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            0 => Some(Self::Search),
            1 => Some(Self::TrackFetch),
            2 => Some(Self::AlbumFetch),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::TrackFetch => "track_fetch",
            Self::AlbumFetch => "album_fetch",
        }
    }

    /// Suffix of the outbound event name for responses of this kind.
    pub fn response_suffix(self) -> &'static str {
        match self {
            Self::Search => "SearchResponse",
            Self::TrackFetch => "TrackFetchResponse",
            Self::AlbumFetch => "AlbumFetchResponse",
        }
    }
}

// -- Requests ------------------------------------------------------------------

/// A decoded inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestEnvelope {
    Search { category: SearchCategory, query: String },
    TrackFetch { album_id: String },
    AlbumFetch { artist_id: String },
}

#[derive(Deserialize)]
struct WireRequest {
    #[serde(rename = "type")]
    tag: u64,
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Deserialize)]
struct WireSearch {
    #[serde(rename = "type", default)]
    category: Option<u64>,
    query: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTrackFetch {
    album_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAlbumFetch {
    artist_id: String,
}

impl RequestEnvelope {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Search { .. } => RequestKind::Search,
            Self::TrackFetch { .. } => RequestKind::TrackFetch,
            Self::AlbumFetch { .. } => RequestKind::AlbumFetch,
        }
    }

    /// Decode a request payload.
    ///
    /// Fails with `MalformedRequest` on an unknown tag or a payload that does
    /// not match its tag.
    pub fn decode(payload: &serde_json::Value) -> Result<Self, RelayError> {
        let wire = WireRequest::deserialize(payload)
            .map_err(|e| RelayError::malformed(format!("bad envelope: {e}")))?;
        let kind = RequestKind::from_tag(wire.tag)
            .ok_or_else(|| RelayError::malformed(format!("unknown request type {}", wire.tag)))?;

        let bad_value =
            |e: serde_json::Error| RelayError::malformed(format!("bad {} payload: {e}", kind.as_str()));
        match kind {
            RequestKind::Search => {
                let search = WireSearch::deserialize(wire.value).map_err(bad_value)?;
                Ok(Self::Search {
                    category: SearchCategory::from_tag(search.category),
                    query: search.query,
                })
            }
            RequestKind::TrackFetch => {
                let fetch = WireTrackFetch::deserialize(wire.value).map_err(bad_value)?;
                Ok(Self::TrackFetch { album_id: fetch.album_id })
            }
            RequestKind::AlbumFetch => {
                let fetch = WireAlbumFetch::deserialize(wire.value).map_err(bad_value)?;
                Ok(Self::AlbumFetch { artist_id: fetch.artist_id })
            }
        }
    }

    /// Encode into the wire shape accepted by [`Self::decode`].
    pub fn to_value(&self) -> serde_json::Value {
        let value = match self {
            Self::Search { category, query } => {
                serde_json::json!({ "type": category.tag(), "query": query })
            }
            Self::TrackFetch { album_id } => serde_json::json!({ "albumId": album_id }),
            Self::AlbumFetch { artist_id } => serde_json::json!({ "artistId": artist_id }),
        };
        serde_json::json!({ "type": self.kind().tag(), "value": value })
    }
}

// -- Responses -----------------------------------------------------------------

/// What a response is about: the search category or the fetched id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Category(SearchCategory),
    Album(String),
    Artist(String),
}

impl Subject {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Category(_) => RequestKind::Search,
            Self::Album(_) => RequestKind::TrackFetch,
            Self::Artist(_) => RequestKind::AlbumFetch,
        }
    }
}

/// A completed upstream result, ready for broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub subject: Subject,
    pub page: Page,
}

#[derive(Serialize)]
struct WireResponse<'a> {
    #[serde(rename = "type")]
    tag: u64,
    value: WireResponseBody<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireResponseBody<'a> {
    subject_id: WireSubject<'a>,
    items: &'a [serde_json::Value],
    limit: u64,
    total: u64,
    offset: u64,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireSubject<'a> {
    Category(u64),
    Id(&'a str),
}

impl ResponseEnvelope {
    pub fn kind(&self) -> RequestKind {
        self.subject.kind()
    }
}

impl Serialize for ResponseEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let subject_id = match &self.subject {
            Subject::Category(c) => WireSubject::Category(c.tag()),
            Subject::Album(id) | Subject::Artist(id) => WireSubject::Id(id),
        };
        WireResponse {
            tag: self.kind().tag(),
            value: WireResponseBody {
                subject_id,
                items: &self.page.items,
                limit: self.page.limit,
                total: self.page.total,
                offset: self.page.offset,
            },
        }
        .serialize(serializer)
    }
}

// -- Event names and framing ---------------------------------------------------

/// Event carrying a connection's display name: `{"name": "..."}`.
pub const USER_NAME_EVENT: &str = "user:name";

/// Namespaced event names, built from the application and service prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNames {
    pub request: String,
    search_response: String,
    track_fetch_response: String,
    album_fetch_response: String,
}

impl EventNames {
    pub fn new(app_prefix: &str, service_prefix: &str) -> Self {
        let name = |suffix: &str| format!("{app_prefix}_{service_prefix}{suffix}");
        Self {
            request: name("Request"),
            search_response: name(RequestKind::Search.response_suffix()),
            track_fetch_response: name(RequestKind::TrackFetch.response_suffix()),
            album_fetch_response: name(RequestKind::AlbumFetch.response_suffix()),
        }
    }

    pub fn response(&self, kind: RequestKind) -> &str {
        match kind {
            RequestKind::Search => &self.search_response,
            RequestKind::TrackFetch => &self.track_fetch_response,
            RequestKind::AlbumFetch => &self.album_fetch_response,
        }
    }
}

/// One WebSocket text frame: `{"event": "<name>", "data": <payload>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;
