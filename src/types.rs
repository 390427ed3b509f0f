//! Core types for the Atom store client.

use crate::error::StreamError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest page the client asks the server for in one round trip.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Version sentinel meaning "the head of the stream".
pub const HEAD: i64 = -1;

/// Media type of a JSON feed page.
pub const FEED_JSON_MEDIA_TYPE: &str = "application/vnd.eventstore.atom+json";

/// Media type of an XML (Atom) feed page.
pub const FEED_XML_MEDIA_TYPE: &str = "application/atom+xml";

/// Media type of a single event document.
pub const EVENT_MEDIA_TYPE: &str = "application/vnd.eventstore.atom+json";

/// Content type used when posting events.
pub const APPEND_MEDIA_TYPE: &str = "application/vnd.eventstore.events+json";

/// Position in a stream.
///
/// Absence of a version (`None` wherever an `Option<StreamVersion>` is taken)
/// means the head of the stream. Only non-negative numbers are valid; a
/// negative number is rejected with [`StreamError::InvalidVersion`] before any
/// request is made.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamVersion {
    pub number: i64,
}

impl StreamVersion {
    pub fn new(number: i64) -> Self {
        Self { number }
    }
}

/// Event numbers past `i64::MAX` saturate rather than wrap into the
/// negative range.
impl From<u64> for StreamVersion {
    fn from(n: u64) -> Self {
        Self::new(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

/// Cap on the number of events one read call returns.
///
/// Absence means no cap: backward reads drain to the start of the stream,
/// forward reads run up to the current head.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Take {
    pub number: u32,
}

impl Take {
    pub fn new(number: u32) -> Self {
        Self { number }
    }
}

/// Read direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// Path segment used in feed URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }

    /// Link relation that leads to the following page in this direction.
    ///
    /// Backward pages chain through `next` (older events). Forward pages
    /// chain through `previous` (newer events).
    pub fn continuation(&self) -> Relation {
        match self {
            Direction::Forward => Relation::Previous,
            Direction::Backward => Relation::Next,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(Direction::Forward),
            "backward" => Ok(Direction::Backward),
            other => Err(StreamError::InvalidDirection(other.to_string())),
        }
    }
}

/// Link relation of a feed or entry link.
///
/// Relations the protocol does not define are kept verbatim in `Other` so
/// documents re-encode unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Relation {
    SelfLink,
    First,
    Last,
    Next,
    Previous,
    Metadata,
    Edit,
    EntryContent,
    Other(String),
}

impl Relation {
    pub fn as_str(&self) -> &str {
        match self {
            Relation::SelfLink => "self",
            Relation::First => "first",
            Relation::Last => "last",
            Relation::Next => "next",
            Relation::Previous => "previous",
            Relation::Metadata => "metadata",
            Relation::Edit => "edit",
            Relation::EntryContent => "entry-content",
            Relation::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for Relation {
    fn from(s: &str) -> Self {
        match s {
            "self" => Relation::SelfLink,
            "first" => Relation::First,
            "last" => Relation::Last,
            "next" => Relation::Next,
            "previous" => Relation::Previous,
            "metadata" => Relation::Metadata,
            "edit" => Relation::Edit,
            "entry-content" => Relation::EntryContent,
            other => Relation::Other(other.to_string()),
        }
    }
}

impl From<String> for Relation {
    fn from(s: String) -> Self {
        Relation::from(s.as_str())
    }
}

impl From<Relation> for String {
    fn from(r: Relation) -> Self {
        r.as_str().to_string()
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A navigation link.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub relation: Relation,
    pub uri: String,
}

impl Link {
    pub fn new(relation: impl Into<Relation>, uri: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            uri: uri.into(),
        }
    }
}

/// Find the first link with the given relation.
pub fn find_link<'a>(links: &'a [Link], relation: &Relation) -> Option<&'a Link> {
    links.iter().find(|l| &l.relation == relation)
}

/// Representation requested for feed pages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FeedFormat {
    #[default]
    Json,
    Xml,
}

impl FeedFormat {
    /// Value for the `Accept` header.
    pub fn media_type(&self) -> &'static str {
        match self {
            FeedFormat::Json => FEED_JSON_MEDIA_TYPE,
            FeedFormat::Xml => FEED_XML_MEDIA_TYPE,
        }
    }
}
