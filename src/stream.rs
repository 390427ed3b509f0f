//! Stream handle and operations.

use crate::client::Client;
use crate::error::{classify, StreamError};
use crate::event::{Document, Event};
use crate::feed::encode_event;
use crate::reader::ReadBuilder;
use crate::traversal::{self, StreamSlice};
use crate::transport::{Request, Response};
use crate::types::{Direction, StreamVersion, Take, APPEND_MEDIA_TYPE};
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use tracing::debug;

/// Protocol header names
pub(crate) const HEADER_EXPECTED_VERSION: &str = "es-expectedversion";
pub(crate) const HEADER_HARD_DELETE: &str = "es-harddelete";

/// Event type of metadata events.
pub const METADATA_EVENT_TYPE: &str = "$metadata";

/// A handle to a stream.
///
/// This is a lightweight, cloneable object - not a persistent connection.
/// Operations make HTTP requests on demand.
#[derive(Clone, Debug)]
pub struct Stream {
    pub(crate) name: String,
    pub(crate) client: Client,
}

impl Stream {
    /// Get the stream name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the stream resource.
    pub fn path(&self) -> String {
        format!("/streams/{}", self.name)
    }

    /// Name of the companion stream holding this stream's metadata.
    pub fn metadata_stream(&self) -> String {
        format!("{}/metadata", self.name)
    }

    /// Append one event.
    pub async fn append(&self, event: &Event) -> Result<Response, StreamError> {
        self.append_with(event, AppendOptions::default()).await
    }

    /// Append one event with options.
    ///
    /// Appends are never retried: a repeated POST could store the event twice.
    pub async fn append_with(
        &self,
        event: &Event,
        options: AppendOptions,
    ) -> Result<Response, StreamError> {
        append_to(&self.client, &self.path(), event, &options).await
    }

    /// Read backward from `version` (head when `None`).
    ///
    /// Events come newest first. With a `take` at most that many are
    /// returned; without one the read continues to event 0.
    pub async fn read_backward(
        &self,
        version: Option<StreamVersion>,
        take: Option<Take>,
    ) -> Result<StreamSlice, StreamError> {
        traversal::read(&self.client, &self.name, Direction::Backward, version, take).await
    }

    /// Read forward from `version` (0 when `None`).
    ///
    /// Events come oldest first. Reading from at or past the head returns an
    /// empty slice rather than an error; call again later to pick up new
    /// events.
    pub async fn read_forward(
        &self,
        version: Option<StreamVersion>,
        take: Option<Take>,
    ) -> Result<StreamSlice, StreamError> {
        traversal::read(&self.client, &self.name, Direction::Forward, version, take).await
    }

    /// Current metadata document, if any has been written.
    ///
    /// Reads the latest event of the metadata stream. An empty metadata stream
    /// is not an error: the document is `None` and the response is the
    /// successful feed response.
    pub async fn metadata(&self) -> Result<(Option<Document>, Response), StreamError> {
        let slice = traversal::read(
            &self.client,
            &self.metadata_stream(),
            Direction::Backward,
            None,
            Some(Take::new(1)),
        )
        .await?;

        let document = slice.events.into_iter().next().map(|e| e.event.data);
        Ok((document, slice.response))
    }

    /// Replace the metadata document.
    ///
    /// Appends one metadata event to the metadata stream.
    pub async fn update_metadata(&self, metadata: Document) -> Result<Response, StreamError> {
        let event = self.client.new_event(METADATA_EVENT_TYPE, metadata, None);
        let path = format!("/streams/{}", self.metadata_stream());
        append_to(&self.client, &path, &event, &AppendOptions::default()).await
    }

    /// Delete the stream. A hard delete cannot be undone.
    pub async fn delete(&self, hard: bool) -> Result<Response, StreamError> {
        self.delete_with(DeleteOptions::new().hard(hard)).await
    }

    /// Delete the stream with options.
    ///
    /// Deleting a stream that is already deleted fails with
    /// [`StreamError::Deleted`] (status 410).
    pub async fn delete_with(&self, options: DeleteOptions) -> Result<Response, StreamError> {
        let mut req = Request::delete(self.client.url(&self.path()));

        if options.hard {
            req = req.header(
                HeaderName::from_static(HEADER_HARD_DELETE),
                HeaderValue::from_static("true"),
            );
        }

        for (key, value) in &options.headers {
            req = req.header(key.clone(), value.clone());
        }

        let req = self.client.prepare(req);
        let resp = self.client.execute(&req).await?;
        classify(&req, &resp)?;

        debug!(stream = %self.name, hard = options.hard, "deleted stream");
        Ok(resp)
    }

    /// Create a reader that tails the stream forward.
    pub fn reader(&self) -> ReadBuilder {
        ReadBuilder::new(self.clone())
    }
}

async fn append_to(
    client: &Client,
    path: &str,
    event: &Event,
    options: &AppendOptions,
) -> Result<Response, StreamError> {
    let body = encode_event(event)?;

    let mut req = Request::post(client.url(path))
        .header(CONTENT_TYPE, HeaderValue::from_static(APPEND_MEDIA_TYPE))
        .body(body);

    if let Some(expected) = options.expected_version {
        req = req.header(
            HeaderName::from_static(HEADER_EXPECTED_VERSION),
            HeaderValue::from(expected),
        );
    }

    for (key, value) in &options.headers {
        req = req.header(key.clone(), value.clone());
    }

    let req = client.prepare(req);
    let resp = client.execute(&req).await?;
    classify(&req, &resp)?;

    debug!(
        url = %req.url,
        event_type = %event.event_type,
        event_id = %event.event_id,
        "appended event"
    );
    Ok(resp)
}

/// Options for appending to a stream.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct AppendOptions {
    /// Version the stream must be at for the append to succeed.
    pub expected_version: Option<i64>,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

impl AppendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expected_version(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }

    pub fn header(mut self, key: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((key, value));
        self
    }
}

/// Options for DELETE request.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct DeleteOptions {
    pub hard: bool,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

impl DeleteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hard(mut self, hard: bool) -> Self {
        self.hard = hard;
        self
    }

    pub fn header(mut self, key: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((key, value));
        self
    }
}
