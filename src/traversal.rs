//! Paged stream reads.
//!
//! A read walks feed pages one at a time, in link order, and folds their
//! entries into one ordered sequence:
//!
//! | Direction | Starts at | Follows | Order |
//! |-----------|-----------|---------|-------|
//! | Backward | version, or head | `next` | descending event number |
//! | Forward | version, or 0 | `previous` | ascending event number |
//!
//! The page size bounds a single round trip. `take` bounds the whole read;
//! without it a backward read drains to event 0 and a forward read runs to
//! the current head. Reading forward from at or past the head yields an empty
//! sequence, which is how live streams are polled.

use crate::client::Client;
use crate::error::{classify, StreamError};
use crate::event::EventResponse;
use crate::feed::{decode_feed, Feed};
use crate::path::build_feed_url;
use crate::resolver::EventResolver;
use crate::transport::{Request, Response};
use crate::types::{Direction, StreamVersion, Take};
use http::header::{HeaderValue, ACCEPT};
use tracing::{debug, trace};

/// Events returned by one read, with the last raw response.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct StreamSlice {
    pub events: Vec<EventResponse>,
    pub response: Response,
}

impl StreamSlice {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

/// Read a stream in one direction.
pub(crate) async fn read(
    client: &Client,
    stream: &str,
    direction: Direction,
    version: Option<StreamVersion>,
    take: Option<Take>,
) -> Result<StreamSlice, StreamError> {
    let mut url = client.url(&build_feed_url(stream, direction, version, take)?);
    let limit = take.map(|t| t.number as usize);
    let accept = HeaderValue::from_static(client.feed_format.media_type());
    let resolver = EventResolver::new(client);

    let mut events: Vec<EventResponse> = Vec::new();

    loop {
        let request = client.prepare(Request::get(url.as_str()).header(ACCEPT, accept.clone()));
        let response = client.execute(&request).await?;
        classify(&request, &response)?;

        let feed =
            decode_feed(&response.body).map_err(|e| e.with_response(&response))?;
        debug!(
            url = %request.url,
            direction = %direction,
            entries = feed.entries.len(),
            "fetched feed page"
        );

        let page = resolve_page(&resolver, &feed, direction).await?;
        let page_len = page.len();
        let before = events.len();

        for event in page {
            if limit.is_some_and(|l| events.len() >= l) {
                break;
            }
            if follows(events.last(), &event, direction) {
                events.push(event);
            }
        }

        if limit.is_some_and(|l| events.len() >= l) {
            trace!(taken = events.len(), "take satisfied");
            return Ok(StreamSlice { events, response });
        }

        if page_len == 0 {
            trace!("empty page, nothing further");
            return Ok(StreamSlice { events, response });
        }

        // Every entry was already read: the links have looped back.
        if events.len() == before {
            trace!(url = %url, "page added no events, stopping");
            return Ok(StreamSlice { events, response });
        }

        match feed.link(&direction.continuation()) {
            Some(link) if client.url(&link.uri) != url => {
                url = client.url(&link.uri);
            }
            _ => {
                trace!(read = events.len(), "no further pages");
                return Ok(StreamSlice { events, response });
            }
        }
    }
}

/// Obtain every event of a page, ordered for the read direction.
async fn resolve_page(
    resolver: &EventResolver<'_>,
    feed: &Feed,
    direction: Direction,
) -> Result<Vec<EventResponse>, StreamError> {
    let mut page = Vec::with_capacity(feed.entries.len());

    for entry in &feed.entries {
        let mut event = match &entry.content {
            Some(event) => event.clone(),
            None => resolver.resolve_url(entry.event_url()).await?.0,
        };
        if event.timestamp.is_none() {
            event.timestamp = Some(entry.updated);
        }
        page.push(event);
    }

    match direction {
        Direction::Backward => page.sort_by(|a, b| b.event_number.cmp(&a.event_number)),
        Direction::Forward => page.sort_by_key(|e| e.event_number),
    }
    Ok(page)
}

/// Whether `next` keeps the sequence strictly monotonic.
fn follows(last: Option<&EventResponse>, next: &EventResponse, direction: Direction) -> bool {
    match (last, direction) {
        (None, _) => true,
        (Some(last), Direction::Backward) => next.event_number < last.event_number,
        (Some(last), Direction::Forward) => next.event_number > last.event_number,
    }
}
