//! Error types for the Atom store client.

use crate::transport::{Request, Response, TransportError};
use thiserror::Error;

/// Error for invalid HTTP header configuration.
#[derive(Debug, Clone, Error)]
pub enum InvalidHeaderError {
    #[error("invalid header name: {0}")]
    InvalidName(String),
    #[error("invalid header value: {0}")]
    InvalidValue(String),
}

/// Main error type for stream operations.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("invalid direction {0:?}: allowed values are \"forward\" or \"backward\"")]
    InvalidDirection(String),

    #[error("invalid version {0}: versions must be non-negative")]
    InvalidVersion(i64),

    #[error("invalid direction ({direction}) and version (head) combination")]
    InvalidDirectionVersionCombination { direction: String },

    #[error("bad request: {} {}", .request.method, .request.url)]
    BadRequest {
        request: Box<Request>,
        response: Box<Response>,
    },

    #[error("not found: {}", .response.status)]
    NotFound { response: Box<Response> },

    #[error("stream deleted: {}", .response.status)]
    Deleted { response: Box<Response> },

    #[error("unexpected status: {}", .response.status)]
    UnexpectedStatus { response: Box<Response> },

    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("malformed response body ({}): {reason}", .response.status)]
    MalformedResponse {
        reason: String,
        response: Box<Response>,
    },

    #[error("invalid base url: {0}")]
    InvalidUrl(String),

    #[error("reader closed")]
    ReaderClosed,

    #[error(transparent)]
    InvalidHeader(#[from] InvalidHeaderError),
}

impl StreamError {
    /// HTTP status code if the error came from a response.
    pub fn status_code(&self) -> Option<u16> {
        self.response().map(Response::status_code)
    }

    /// The response that caused the error, if any.
    pub fn response(&self) -> Option<&Response> {
        match self {
            StreamError::BadRequest { response, .. }
            | StreamError::NotFound { response }
            | StreamError::Deleted { response }
            | StreamError::UnexpectedStatus { response }
            | StreamError::MalformedResponse { response, .. } => Some(response),
            _ => None,
        }
    }

    /// The original outbound request of a `BadRequest`.
    pub fn request(&self) -> Option<&Request> {
        match self {
            StreamError::BadRequest { request, .. } => Some(request),
            _ => None,
        }
    }

    /// Attach the response whose body failed to decode.
    pub(crate) fn with_response(self, response: &Response) -> Self {
        match self {
            StreamError::Decode(reason) => StreamError::MalformedResponse {
                reason,
                response: Box::new(response.clone()),
            },
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StreamError::NotFound { .. })
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, StreamError::Deleted { .. })
    }

    /// Whether the error was raised by input validation, before any request.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StreamError::InvalidDirection(_)
                | StreamError::InvalidVersion(_)
                | StreamError::InvalidDirectionVersionCombination { .. }
        )
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Decode(err.to_string())
    }
}

impl From<quick_xml::de::DeError> for StreamError {
    fn from(err: quick_xml::de::DeError) -> Self {
        StreamError::Decode(err.to_string())
    }
}

impl From<chrono::ParseError> for StreamError {
    fn from(err: chrono::ParseError) -> Self {
        StreamError::Decode(err.to_string())
    }
}

/// Map a response to success or a typed error.
///
/// | Status | Result |
/// |---|---|
/// | 2xx | `Ok(())` |
/// | 400 | `BadRequest` carrying the request |
/// | 404 | `NotFound` |
/// | 410 | `Deleted` |
/// | other | `UnexpectedStatus` |
///
/// Soft and hard deletes both surface as `Deleted`; which one happened is only
/// known from the header sent on the delete request.
pub fn classify(request: &Request, response: &Response) -> Result<(), StreamError> {
    let boxed = || Box::new(response.clone());

    match response.status_code() {
        200..=299 => Ok(()),
        400 => Err(StreamError::BadRequest {
            request: Box::new(request.clone()),
            response: boxed(),
        }),
        404 => Err(StreamError::NotFound { response: boxed() }),
        410 => Err(StreamError::Deleted { response: boxed() }),
        _ => Err(StreamError::UnexpectedStatus { response: boxed() }),
    }
}
