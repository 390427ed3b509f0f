//! Stream consumption with StreamReader.

use crate::error::StreamError;
use crate::event::EventResponse;
use crate::stream::Stream;
use crate::transport::Response;
use crate::types::{StreamVersion, Take, DEFAULT_PAGE_SIZE};
use futures::Stream as FuturesStream;
use std::collections::VecDeque;

/// Builder for configuring a tailing reader.
#[derive(Debug)]
#[must_use = "builders do nothing unless you call .build()"]
pub struct ReadBuilder {
    stream: Stream,
    from: u64,
    batch: u32,
}

impl ReadBuilder {
    pub(crate) fn new(stream: Stream) -> Self {
        Self {
            stream,
            from: 0,
            batch: DEFAULT_PAGE_SIZE,
        }
    }

    /// Event number to start reading at.
    pub fn from(mut self, version: u64) -> Self {
        self.from = version;
        self
    }

    /// Number of events fetched per read call.
    pub fn page_size(mut self, size: u32) -> Self {
        self.batch = size.max(1);
        self
    }

    /// Build the StreamReader.
    ///
    /// No network request is made until `next_event()` is called.
    pub fn build(self) -> StreamReader {
        StreamReader {
            stream: self.stream,
            next_version: self.from,
            batch: self.batch,
            buffer: VecDeque::new(),
            last_response: None,
            up_to_date: false,
            closed: false,
        }
    }
}

/// Reads a stream forward one event at a time.
///
/// When the reader has caught up with the head, `next_event()` returns
/// `Ok(None)`. The reader does not wait for new events; call `next_event()`
/// again later to pick up whatever was appended in the meantime.
#[derive(Debug)]
pub struct StreamReader {
    stream: Stream,
    next_version: u64,
    batch: u32,
    buffer: VecDeque<EventResponse>,
    last_response: Option<Response>,
    up_to_date: bool,
    closed: bool,
}

impl StreamReader {
    /// Event number the next fetch starts at.
    pub fn position(&self) -> u64 {
        self.next_version
    }

    /// Check if we've caught up to the stream head.
    pub fn is_up_to_date(&self) -> bool {
        self.up_to_date
    }

    /// The response of the most recent fetch.
    pub fn last_response(&self) -> Option<&Response> {
        self.last_response.as_ref()
    }

    /// Close the reader and drop buffered events.
    pub fn close(&mut self) {
        self.closed = true;
        self.buffer.clear();
    }

    /// Fetch the next event.
    pub async fn next_event(&mut self) -> Result<Option<EventResponse>, StreamError> {
        if self.closed {
            return Err(StreamError::ReaderClosed);
        }

        if let Some(event) = self.buffer.pop_front() {
            return Ok(Some(event));
        }

        let slice = self
            .stream
            .read_forward(
                Some(StreamVersion::from(self.next_version)),
                Some(Take::new(self.batch)),
            )
            .await?;

        self.last_response = Some(slice.response);
        self.up_to_date = slice.events.len() < self.batch as usize;

        if let Some(last) = slice.events.last() {
            self.next_version = last.event_number + 1;
        }
        self.buffer.extend(slice.events);

        Ok(self.buffer.pop_front())
    }

    /// Turn the reader into a stream that ends once caught up.
    pub fn into_stream(self) -> impl FuturesStream<Item = Result<EventResponse, StreamError>> {
        futures::stream::try_unfold(self, |mut reader| async move {
            Ok(reader.next_event().await?.map(|event| (event, reader)))
        })
    }
}
