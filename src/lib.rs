//! Atom Store Rust Client
//!
//! A Rust client for event stores that expose streams as paged, linked Atom
//! feeds over HTTP. Append events, read ranges forward or backward from any
//! version, tail a stream for new events, manage stream metadata and delete
//! streams.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use atomstore::{Client, Document, Take};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .base_url("http://localhost:2113")
//!         .basic_auth("admin", "changeit")
//!         .build()?;
//!     let stream = client.stream("orders");
//!
//!     // Append an event
//!     let data = Document::from_json(r#"{"sku":"A-1","qty":2}"#)?;
//!     stream.append(&client.new_event("OrderPlaced", data, None)).await?;
//!
//!     // Latest ten events, newest first
//!     let slice = stream.read_backward(None, Some(Take::new(10))).await?;
//!     for event in &slice.events {
//!         println!("{} {}", event.event_number, event.event.event_type);
//!     }
//!
//!     // Tail from version 0
//!     let mut reader = stream.reader().from(0).build();
//!     while let Some(event) = reader.next_event().await? {
//!         println!("got {}", event.event_number);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod event;
mod feed;
mod path;
mod reader;
mod resolver;
mod stream;
mod transport;
mod traversal;
mod types;

#[cfg(test)]
mod simulator;

pub use client::{Client, ClientBuilder};
pub use error::{classify, InvalidHeaderError, StreamError};
pub use event::{Document, Event, EventResponse, IdGenerator, UuidGenerator};
pub use feed::{
    decode_event, decode_feed, encode_event, encode_event_response, encode_feed, Author, Entry,
    Feed,
};
pub use path::{build_feed_path, build_feed_url};
pub use reader::{ReadBuilder, StreamReader};
pub use resolver::EventResolver;
pub use stream::{AppendOptions, DeleteOptions, Stream, METADATA_EVENT_TYPE};
pub use transport::{ReqwestTransport, Request, Response, Transport, TransportError};
pub use traversal::StreamSlice;
pub use types::{
    find_link, Direction, FeedFormat, Link, Relation, StreamVersion, Take, APPEND_MEDIA_TYPE,
    DEFAULT_PAGE_SIZE, EVENT_MEDIA_TYPE, FEED_JSON_MEDIA_TYPE, FEED_XML_MEDIA_TYPE, HEAD,
};
