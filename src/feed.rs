//! Feed pages and the document codec.
//!
//! A feed page arrives either as Atom JSON or as Atom XML. Both decode to the
//! same [`Feed`]; the representation is detected from the body itself, so a
//! server answering in the other format than the one asked for still works.
//!
//! ## JSON page
//!
//! ```json
//! {
//!   "title": "Event stream 'orders'",
//!   "id": "http://localhost:2113/streams/orders",
//!   "updated": "2016-05-01T10:00:00Z",
//!   "author": { "name": "EventStore" },
//!   "links": [ { "relation": "next", "uri": "..." } ],
//!   "entries": [ { "title": "0@orders", "id": "...", "updated": "...",
//!                  "summary": "OrderPlaced", "links": [...], "content": {...} } ]
//! }
//! ```
//!
//! ## XML page
//!
//! Standard Atom elements. An embedded event travels as the JSON event
//! document in the text of `<content>`.

use crate::error::StreamError;
use crate::event::{Event, EventResponse};
use crate::types::{find_link, FeedFormat, Link, Relation, EVENT_MEDIA_TYPE};
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

/// Feed or entry author.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: String,
}

/// One page of a stream.
///
/// Entries are newest first on backward pages. Servers are free to order
/// forward pages either way; the traversal engine orders by event number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub title: String,
    pub id: String,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub author: Author,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl Feed {
    pub fn link(&self, relation: &Relation) -> Option<&Link> {
        find_link(&self.links, relation)
    }

    /// URLs of the events on this page, in page order.
    pub fn event_urls(&self) -> Vec<&str> {
        self.entries.iter().map(Entry::event_url).collect()
    }
}

/// One entry of a feed page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub title: String,
    pub id: String,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub author: Author,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub links: Vec<Link>,
    /// Event embedded in the page, when the server inlined it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<EventResponse>,
}

impl Entry {
    /// Where the full event document lives.
    ///
    /// Prefers an `entry-content` link, then `edit`, then the entry id.
    pub fn event_url(&self) -> &str {
        find_link(&self.links, &Relation::EntryContent)
            .or_else(|| find_link(&self.links, &Relation::Edit))
            .map(|l| l.uri.as_str())
            .unwrap_or(self.id.as_str())
    }
}

/// Decode a feed page in either representation.
pub fn decode_feed(bytes: &[u8]) -> Result<Feed, StreamError> {
    match sniff(bytes) {
        FeedFormat::Json => Ok(serde_json::from_slice(bytes)?),
        FeedFormat::Xml => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| StreamError::Decode(format!("feed is not utf-8: {e}")))?;
            let xml: XmlFeed = quick_xml::de::from_str(text)?;
            xml.try_into()
        }
    }
}

/// Encode a feed page.
pub fn encode_feed(feed: &Feed, format: FeedFormat) -> Result<Bytes, StreamError> {
    match format {
        FeedFormat::Json => Ok(serde_json::to_vec(feed)?.into()),
        FeedFormat::Xml => {
            let xml = XmlFeed::try_from(feed)?;
            let text = quick_xml::se::to_string(&xml)
                .map_err(|e| StreamError::Decode(format!("cannot encode feed: {e}")))?;
            Ok(Bytes::from(text))
        }
    }
}

/// Decode a single event document.
pub fn decode_event(bytes: &[u8]) -> Result<EventResponse, StreamError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Encode a single event document, as served for event links.
pub fn encode_event_response(event: &EventResponse) -> Result<Bytes, StreamError> {
    Ok(serde_json::to_vec(event)?.into())
}

/// Encode an event as the append envelope.
pub fn encode_event(event: &Event) -> Result<Bytes, StreamError> {
    Ok(serde_json::to_vec(event)?.into())
}

fn sniff(bytes: &[u8]) -> FeedFormat {
    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'<') => FeedFormat::Xml,
        _ => FeedFormat::Json,
    }
}

fn format_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, StreamError> {
    Ok(DateTime::parse_from_rfc3339(s.trim())?.with_timezone(&Utc))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "feed")]
struct XmlFeed {
    #[serde(rename = "@xmlns", default)]
    xmlns: String,
    title: String,
    id: String,
    updated: String,
    #[serde(default)]
    author: Author,
    #[serde(rename = "link", default)]
    links: Vec<XmlLink>,
    #[serde(rename = "entry", default)]
    entries: Vec<XmlEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct XmlLink {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@rel")]
    rel: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct XmlEntry {
    title: String,
    id: String,
    updated: String,
    #[serde(default)]
    author: Author,
    #[serde(default)]
    summary: String,
    #[serde(rename = "link", default)]
    links: Vec<XmlLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<XmlContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct XmlContent {
    #[serde(rename = "@type", default)]
    media_type: String,
    #[serde(rename = "$text")]
    body: String,
}

impl From<&Link> for XmlLink {
    fn from(link: &Link) -> Self {
        XmlLink {
            href: link.uri.clone(),
            rel: link.relation.to_string(),
        }
    }
}

impl From<XmlLink> for Link {
    fn from(link: XmlLink) -> Self {
        Link::new(link.rel, link.href)
    }
}

impl TryFrom<&Feed> for XmlFeed {
    type Error = StreamError;

    fn try_from(feed: &Feed) -> Result<Self, Self::Error> {
        let entries = feed
            .entries
            .iter()
            .map(XmlEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(XmlFeed {
            xmlns: ATOM_NAMESPACE.to_string(),
            title: feed.title.clone(),
            id: feed.id.clone(),
            updated: format_time(&feed.updated),
            author: feed.author.clone(),
            links: feed.links.iter().map(XmlLink::from).collect(),
            entries,
        })
    }
}

impl TryFrom<XmlFeed> for Feed {
    type Error = StreamError;

    fn try_from(xml: XmlFeed) -> Result<Self, Self::Error> {
        let entries = xml
            .entries
            .into_iter()
            .map(Entry::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Feed {
            title: xml.title,
            id: xml.id,
            updated: parse_time(&xml.updated)?,
            author: xml.author,
            links: xml.links.into_iter().map(Link::from).collect(),
            entries,
        })
    }
}

impl TryFrom<&Entry> for XmlEntry {
    type Error = StreamError;

    fn try_from(entry: &Entry) -> Result<Self, Self::Error> {
        let content = match &entry.content {
            Some(event) => Some(XmlContent {
                media_type: EVENT_MEDIA_TYPE.to_string(),
                body: serde_json::to_string(event)?,
            }),
            None => None,
        };

        Ok(XmlEntry {
            title: entry.title.clone(),
            id: entry.id.clone(),
            updated: format_time(&entry.updated),
            author: entry.author.clone(),
            summary: entry.summary.clone(),
            links: entry.links.iter().map(XmlLink::from).collect(),
            content,
        })
    }
}

impl TryFrom<XmlEntry> for Entry {
    type Error = StreamError;

    fn try_from(xml: XmlEntry) -> Result<Self, Self::Error> {
        let content = match xml.content {
            Some(c) if !c.body.trim().is_empty() => Some(decode_event(c.body.as_bytes())?),
            _ => None,
        };

        Ok(Entry {
            title: xml.title,
            id: xml.id,
            updated: parse_time(&xml.updated)?,
            author: xml.author,
            summary: xml.summary,
            links: xml.links.into_iter().map(Link::from).collect(),
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Document;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_462_096_800 + secs, 0).unwrap()
    }

    fn event(n: u64, embedded: bool) -> Entry {
        let url = format!("http://localhost:2113/streams/some-stream/{n}");
        let content = embedded.then(|| EventResponse {
            event: Event::new(
                format!("id-{n}"),
                "EventTypeX",
                Document::from_json(format!(r#"{{"n":{n}}}"#)).unwrap(),
                None,
            ),
            event_number: n,
            links: vec![Link::new(Relation::Edit, url.clone())],
            timestamp: Some(at(n as i64)),
        });

        Entry {
            title: format!("{n}@some-stream"),
            id: url.clone(),
            updated: at(n as i64),
            author: Author {
                name: "EventStore".to_string(),
            },
            summary: "EventTypeX".to_string(),
            links: vec![
                Link::new(Relation::Edit, url.clone()),
                Link::new("alternate", url),
            ],
            content,
        }
    }

    fn feed(embedded: bool) -> Feed {
        Feed {
            title: "Event stream 'some-stream'".to_string(),
            id: "http://localhost:2113/streams/some-stream".to_string(),
            updated: at(10),
            author: Author {
                name: "EventStore".to_string(),
            },
            links: vec![
                Link::new(
                    Relation::SelfLink,
                    "http://localhost:2113/streams/some-stream",
                ),
                Link::new(
                    Relation::Next,
                    "http://localhost:2113/streams/some-stream/0/backward/2",
                ),
            ],
            entries: vec![event(2, embedded), event(1, embedded)],
        }
    }

    #[test]
    fn test_json_round_trip() {
        let want = feed(false);
        let bytes = encode_feed(&want, FeedFormat::Json).unwrap();
        assert_eq!(decode_feed(&bytes).unwrap(), want);
    }

    #[test]
    fn test_xml_round_trip() {
        let want = feed(false);
        let bytes = encode_feed(&want, FeedFormat::Xml).unwrap();
        assert!(bytes.starts_with(b"<feed"));
        assert_eq!(decode_feed(&bytes).unwrap(), want);
    }

    #[test]
    fn test_representations_decode_identically() {
        let want = feed(true);
        let from_json = decode_feed(&encode_feed(&want, FeedFormat::Json).unwrap()).unwrap();
        let from_xml = decode_feed(&encode_feed(&want, FeedFormat::Xml).unwrap()).unwrap();
        assert_eq!(from_json, from_xml);
        assert_eq!(from_json, want);
    }

    #[test]
    fn test_decode_handwritten_xml() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Event stream 'orders'</title>
  <id>http://localhost:2113/streams/orders</id>
  <updated>2016-05-01T10:00:00Z</updated>
  <author><name>EventStore</name></author>
  <link href="http://localhost:2113/streams/orders" rel="self"/>
  <link href="http://localhost:2113/streams/orders/head/backward/20" rel="first"/>
  <entry>
    <title>0@orders</title>
    <id>http://localhost:2113/streams/orders/0</id>
    <updated>2016-05-01T10:00:00Z</updated>
    <author><name>EventStore</name></author>
    <summary>OrderPlaced</summary>
    <link href="http://localhost:2113/streams/orders/0" rel="edit"/>
  </entry>
</feed>"#;

        let feed = decode_feed(xml.as_bytes()).unwrap();
        assert_eq!(feed.title, "Event stream 'orders'");
        assert_eq!(feed.links.len(), 2);
        assert_eq!(feed.links[1].relation, Relation::First);
        assert_eq!(feed.entries.len(), 1);
        assert_eq!(feed.entries[0].summary, "OrderPlaced");
        assert!(feed.entries[0].content.is_none());
        assert_eq!(
            feed.event_urls(),
            vec!["http://localhost:2113/streams/orders/0"]
        );
    }

    #[test]
    fn test_event_urls_in_page_order() {
        let f = feed(false);
        assert_eq!(
            f.event_urls(),
            vec![
                "http://localhost:2113/streams/some-stream/2",
                "http://localhost:2113/streams/some-stream/1",
            ]
        );
    }

    #[test]
    fn test_event_url_fallbacks() {
        let mut entry = event(3, false);
        entry.links.push(Link::new(
            Relation::EntryContent,
            "http://localhost:2113/streams/some-stream/3?embed=body",
        ));
        assert_eq!(
            entry.event_url(),
            "http://localhost:2113/streams/some-stream/3?embed=body"
        );

        entry.links.clear();
        assert_eq!(entry.event_url(), "http://localhost:2113/streams/some-stream/3");
    }

    #[test]
    fn test_decode_event_document() {
        let json = r#"{
            "eventId": "fbf4a1a1-b4a3-4dfe-a01f-ec52c34e16e4",
            "eventType": "SomeEventType",
            "eventNumber": 299,
            "data": {"a": "1"},
            "metaData": {"b": "2"},
            "timestamp": "2016-05-01T10:00:00Z",
            "links": [{"uri": "http://localhost:2113/streams/some-stream/299", "relation": "edit"}]
        }"#;

        let ev = decode_event(json.as_bytes()).unwrap();
        assert_eq!(ev.event_number, 299);
        assert_eq!(ev.event.event_type, "SomeEventType");
        assert_eq!(ev.event.metadata.unwrap().as_str(), r#"{"b": "2"}"#);
        assert_eq!(ev.links[0].relation, Relation::Edit);
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        assert!(matches!(
            decode_feed(b"{\"title\": 5}"),
            Err(StreamError::Decode(_))
        ));
        assert!(matches!(decode_feed(b"<feed><title>"), Err(StreamError::Decode(_))));
        assert!(matches!(decode_event(b"nope"), Err(StreamError::Decode(_))));
    }

    #[test]
    fn test_encode_event_envelope() {
        let ev = Event::new(
            "some-uuid",
            "SomeEventType",
            Document::from_json(r#""some-string""#).unwrap(),
            None,
        );
        let bytes = encode_event(&ev).unwrap();
        assert_eq!(
            &bytes[..],
            br#"{"eventType":"SomeEventType","eventId":"some-uuid","data":"some-string"}"#
        );
    }
}
