//! Events, persisted event views and their payload documents.

use crate::types::Link;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;

/// Opaque, already-serialized JSON document carried as event data or metadata.
///
/// The client never looks inside a document. Use [`Document::encode`] and
/// [`Document::decode`] to move between documents and your own types.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Box<RawValue>);

impl Document {
    /// Content tag of every document.
    pub const CONTENT_TYPE: &'static str = "application/json";

    /// Wrap raw JSON text. Fails if the text is not valid JSON.
    pub fn from_json(json: impl Into<String>) -> Result<Self, serde_json::Error> {
        RawValue::from_string(json.into()).map(Document)
    }

    /// Wrap raw JSON bytes. Fails if the bytes are not valid JSON.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice::<Box<RawValue>>(bytes).map(Document)
    }

    /// Serialize a value into a document.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::value::to_raw_value(value).map(Document)
    }

    /// Deserialize the document into a value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(self.0.get())
    }

    pub fn as_str(&self) -> &str {
        self.0.get()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.get().as_bytes()
    }

    pub fn content_type(&self) -> &'static str {
        Self::CONTENT_TYPE
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Document {}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Document").field(&self.as_str()).finish()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event as appended by the caller.
///
/// Serializes to the append envelope `{eventType, eventId, data, metaData?}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_type: String,
    pub event_id: String,
    pub data: Document,
    #[serde(rename = "metaData", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Document>,
}

impl Event {
    pub fn new(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        data: Document,
        metadata: Option<Document>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            event_id: event_id.into(),
            data,
            metadata,
        }
    }
}

/// A persisted event as read back from the store.
///
/// Built by the client on read and never modified afterwards. Serializes as
/// the single event document `{eventId, eventType, eventNumber, data,
/// metaData?, timestamp?, links?}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EventDocument", into = "EventDocument")]
pub struct EventResponse {
    pub event: Event,
    /// Zero-based position in the stream, assigned by the server.
    pub event_number: u64,
    pub links: Vec<Link>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Wire shape of a single event document, also used for content embedded in
/// feed entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventDocument {
    pub event_id: String,
    pub event_type: String,
    pub event_number: u64,
    pub data: Document,
    #[serde(rename = "metaData", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl From<EventDocument> for EventResponse {
    fn from(doc: EventDocument) -> Self {
        EventResponse {
            event: Event {
                event_type: doc.event_type,
                event_id: doc.event_id,
                data: doc.data,
                metadata: doc.metadata,
            },
            event_number: doc.event_number,
            links: doc.links,
            timestamp: doc.timestamp,
        }
    }
}

impl From<EventResponse> for EventDocument {
    fn from(resp: EventResponse) -> Self {
        EventDocument {
            event_id: resp.event.event_id,
            event_type: resp.event.event_type,
            event_number: resp.event_number,
            data: resp.event.data,
            metadata: resp.event.metadata,
            timestamp: resp.timestamp,
            links: resp.links,
        }
    }
}

/// Source of event identifiers for events built by the client.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random (v4) UUID identifiers.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
