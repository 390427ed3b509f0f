//! Single event resolution.

use crate::client::Client;
use crate::error::{classify, StreamError};
use crate::event::EventResponse;
use crate::feed::decode_event;
use crate::transport::{Request, Response};
use crate::types::{Link, EVENT_MEDIA_TYPE};
use http::header::{HeaderValue, ACCEPT};
use tracing::debug;

/// Fetches and decodes one event document given its link.
#[derive(Clone, Copy, Debug)]
pub struct EventResolver<'a> {
    client: &'a Client,
}

impl<'a> EventResolver<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Resolve the event a link points at.
    pub async fn resolve(&self, link: &Link) -> Result<(EventResponse, Response), StreamError> {
        self.resolve_url(&link.uri).await
    }

    /// Resolve an event by URL or path.
    ///
    /// Non-2xx statuses become the classified error, which carries the
    /// response.
    pub async fn resolve_url(&self, url: &str) -> Result<(EventResponse, Response), StreamError> {
        let request = self.client.prepare(
            Request::get(self.client.url(url))
                .header(ACCEPT, HeaderValue::from_static(EVENT_MEDIA_TYPE)),
        );

        let response = self.client.execute(&request).await?;
        classify(&request, &response)?;

        let event =
            decode_event(&response.body).map_err(|e| e.with_response(&response))?;
        debug!(url = %request.url, event_number = event.event_number, "resolved event");

        Ok((event, response))
    }
}

impl Client {
    /// Read a single event from its URL.
    pub async fn read_event(&self, url: &str) -> Result<(EventResponse, Response), StreamError> {
        EventResolver::new(self).resolve_url(url).await
    }
}
