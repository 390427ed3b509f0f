//! HTTP client and configuration.

use crate::error::{InvalidHeaderError, StreamError};
use crate::event::{Document, Event, IdGenerator, UuidGenerator};
use crate::stream::Stream;
use crate::transport::{ReqwestTransport, Request, Response, Transport};
use crate::types::FeedFormat;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use std::sync::Arc;
use std::time::Duration;

/// An Atom store client.
///
/// The client is cloneable and can be shared across threads. Its
/// configuration is fixed once built, so concurrent reads need no locking.
#[derive(Clone)]
pub struct Client {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) base_url: String,
    pub(crate) default_headers: HeaderMap,
    pub(crate) header_provider: Option<Arc<dyn Fn() -> HeaderMap + Send + Sync>>,
    pub(crate) feed_format: FeedFormat,
    pub(crate) id_generator: Arc<dyn IdGenerator>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("default_headers", &self.default_headers)
            .field("has_header_provider", &self.header_provider.is_some())
            .field("feed_format", &self.feed_format)
            .finish()
    }
}

impl Client {
    /// Create a client builder for customization.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a stream handle for the given stream name.
    ///
    /// No network request is made until an operation is called.
    pub fn stream(&self, name: impl Into<String>) -> Stream {
        Stream {
            name: name.into(),
            client: self.clone(),
        }
    }

    /// Build an event with an identifier from the configured generator.
    pub fn new_event(
        &self,
        event_type: impl Into<String>,
        data: Document,
        metadata: Option<Document>,
    ) -> Event {
        Event::new(self.id_generator.next_id(), event_type, data, metadata)
    }

    /// Resolve a path or absolute URL against the base URL.
    ///
    /// - `http://` and `https://` URLs are returned unchanged
    /// - anything else is appended to the base URL
    pub(crate) fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url.trim_end_matches('/'), path)
        }
    }

    /// Get headers for a request, including dynamic headers if configured.
    pub(crate) fn get_headers(&self) -> HeaderMap {
        let mut headers = self.default_headers.clone();
        if let Some(provider) = &self.header_provider {
            for (key, value) in provider().iter() {
                headers.insert(key.clone(), value.clone());
            }
        }
        headers
    }

    /// Apply client headers to a request. Headers already on the request win.
    pub(crate) fn prepare(&self, mut request: Request) -> Request {
        let own = std::mem::take(&mut request.headers);
        request.headers(&self.get_headers()).headers(&own)
    }

    /// Send a prepared request.
    ///
    /// Only transport failures are errors here; status handling is left to
    /// the caller.
    pub(crate) async fn execute(&self, request: &Request) -> Result<Response, StreamError> {
        self.transport
            .send(request.clone())
            .await
            .map_err(StreamError::Transport)
    }
}

/// Builder for configuring a Client.
#[must_use = "builders do nothing unless you call .build()"]
pub struct ClientBuilder {
    base_url: Option<String>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
    header_provider: Option<Arc<dyn Fn() -> HeaderMap + Send + Sync>>,
    feed_format: FeedFormat,
    id_generator: Option<Arc<dyn IdGenerator>>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            timeout: None,
            header_provider: None,
            feed_format: FeedFormat::default(),
            id_generator: None,
            transport: None,
        }
    }

    /// Set the store address, e.g. `http://localhost:2113`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Add a default header for all requests.
    ///
    /// Invalid header names or values are silently ignored. Use
    /// [`try_default_header`](Self::try_default_header) if you need error handling.
    pub fn default_header(mut self, key: &str, value: &str) -> Self {
        if let (Ok(name), Ok(val)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.default_headers.insert(name, val);
        }
        self
    }

    /// Add a default header, returning an error if the name or value is invalid.
    pub fn try_default_header(
        mut self,
        key: &str,
        value: &str,
    ) -> std::result::Result<Self, InvalidHeaderError> {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| InvalidHeaderError::InvalidName(key.to_string()))?;
        let val = HeaderValue::from_str(value)
            .map_err(|_| InvalidHeaderError::InvalidValue(value.to_string()))?;
        self.default_headers.insert(name, val);
        Ok(self)
    }

    /// Set all default headers.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    /// Authenticate every request with HTTP basic auth.
    pub fn basic_auth(mut self, username: &str, password: &str) -> Self {
        let token = STANDARD.encode(format!("{username}:{password}"));
        if let Ok(mut value) = HeaderValue::from_str(&format!("Basic {token}")) {
            value.set_sensitive(true);
            self.default_headers.insert(AUTHORIZATION, value);
        }
        self
    }

    /// Set the request timeout of the default transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set a dynamic header provider (called per-request).
    ///
    /// Use this for credentials that rotate while the client is in use.
    pub fn header_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> HeaderMap + Send + Sync + 'static,
    {
        self.header_provider = Some(Arc::new(provider));
        self
    }

    /// Choose the representation requested for feed pages.
    pub fn feed_format(mut self, format: FeedFormat) -> Self {
        self.feed_format = format;
        self
    }

    /// Set the identifier source used by [`Client::new_event`].
    pub fn id_generator<G>(mut self, generator: G) -> Self
    where
        G: IdGenerator + 'static,
    {
        self.id_generator = Some(Arc::new(generator));
        self
    }

    /// Replace the default `reqwest` transport.
    pub fn transport<T>(mut self, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Build the client.
    ///
    /// Fails if no base URL was given, if it is not an `http(s)` URL, or if
    /// the default transport cannot be built (e.g. TLS configuration).
    pub fn build(self) -> Result<Client, StreamError> {
        let base_url = self
            .base_url
            .ok_or_else(|| StreamError::InvalidUrl("missing base url".to_string()))?;

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(StreamError::InvalidUrl(format!(
                "{base_url}: missing protocol scheme"
            )));
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                ReqwestTransport::new(self.timeout)
                    .map_err(|e| StreamError::Transport(Box::new(e)))?,
            ),
        };

        Ok(Client {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers: self.default_headers,
            header_provider: self.header_provider,
            feed_format: self.feed_format,
            id_generator: self
                .id_generator
                .unwrap_or_else(|| Arc::new(UuidGenerator)),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
