//! In-memory store serving the Atom protocol, for tests.

use crate::event::{Document, Event, EventResponse};
use crate::feed::{encode_event_response, encode_feed, Author, Entry, Feed};
use crate::transport::{Request, Response, Transport, TransportError};
use crate::types::{FeedFormat, Link, Relation, EVENT_MEDIA_TYPE};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use http::{Method, StatusCode};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

const BASE: &str = "http://localhost:2113";

#[derive(Default)]
struct StreamState {
    events: Vec<EventResponse>,
    deleted: bool,
}

#[derive(Default)]
struct Inner {
    streams: HashMap<String, StreamState>,
    requests: Vec<Request>,
    forced: Option<Response>,
    failure: Option<io::ErrorKind>,
}

#[derive(Clone, Default)]
pub(crate) struct Simulator {
    inner: Arc<Mutex<Inner>>,
    embed: bool,
}

fn timestamp(n: u64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_462_096_800 + n as i64, 0).unwrap()
}

fn event_url(stream: &str, n: u64) -> String {
    format!("{BASE}/streams/{stream}/{n}")
}

impl Simulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inline event documents in feed entries.
    pub fn embed_events(mut self, embed: bool) -> Self {
        self.embed = embed;
        self
    }

    /// Answer every request with this status.
    pub fn respond_with(&self, status: StatusCode) {
        self.inner.lock().forced = Some(Response::new(status));
    }

    /// Answer every request with this status and raw body.
    pub fn respond_with_body(&self, status: StatusCode, body: &'static str) {
        self.inner.lock().forced =
            Some(Response::new(status).with_body(EVENT_MEDIA_TYPE, body));
    }

    /// Fail every request at the transport level with an I/O error.
    pub fn fail_with(&self, kind: io::ErrorKind) {
        self.inner.lock().failure = Some(kind);
    }

    /// Create `count` events numbered from the current end of `stream`.
    pub fn seed(&self, stream: &str, count: u64, event_type: &str) {
        let mut inner = self.inner.lock();
        let state = inner.streams.entry(stream.to_string()).or_default();
        for _ in 0..count {
            let n = state.events.len() as u64;
            let data = Document::from_json(format!(r#"{{"number":{n}}}"#)).unwrap();
            let event = Event::new(format!("{stream}-{n}"), event_type, data, None);
            state.events.push(persist(stream, n, event));
        }
    }

    pub fn event(&self, stream: &str, n: u64) -> Option<EventResponse> {
        let inner = self.inner.lock();
        inner
            .streams
            .get(stream)
            .and_then(|s| s.events.get(n as usize).cloned())
    }

    pub fn events(&self, stream: &str) -> Vec<EventResponse> {
        let inner = self.inner.lock();
        inner
            .streams
            .get(stream)
            .map(|s| s.events.clone())
            .unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.inner.lock().requests.clone()
    }

    pub fn last_request(&self) -> Option<Request> {
        self.inner.lock().requests.last().cloned()
    }

    fn handle(&self, request: &Request) -> Response {
        let mut inner = self.inner.lock();
        inner.requests.push(request.clone());

        if let Some(resp) = &inner.forced {
            return resp.clone();
        }

        let path = request
            .url
            .split_once("/streams/")
            .map(|(_, rest)| rest)
            .unwrap_or("");
        let path = path.split('?').next().unwrap_or("");
        let segments: Vec<&str> = path.split('/').collect();

        match request.method {
            Method::GET => self.get(&inner, request, &segments),
            Method::POST => append(&mut inner, request, path),
            Method::DELETE => delete(&mut inner, path),
            _ => Response::new(StatusCode::METHOD_NOT_ALLOWED),
        }
    }

    fn get(&self, inner: &Inner, request: &Request, segments: &[&str]) -> Response {
        let len = segments.len();

        if len >= 4 && matches!(segments[len - 2], "forward" | "backward") {
            let stream = segments[..len - 3].join("/");
            let page_size: u64 = segments[len - 1].parse().unwrap_or(20);
            let format = match request.header_str("accept") {
                Some(accept) if accept.contains("xml") => FeedFormat::Xml,
                _ => FeedFormat::Json,
            };

            let events: &[EventResponse] = match inner.streams.get(&stream) {
                Some(s) if s.deleted => return Response::new(StatusCode::GONE),
                Some(s) => s.events.as_slice(),
                // A metadata stream of an existing stream reads as empty.
                None => match stream.strip_suffix("/metadata") {
                    Some(base) if inner.streams.contains_key(base) => &[],
                    _ => return Response::new(StatusCode::NOT_FOUND),
                },
            };

            let feed = if segments[len - 2] == "backward" {
                let from = match segments[len - 3] {
                    "head" => None,
                    v => v.parse::<u64>().ok(),
                };
                self.backward_page(&stream, events, from, page_size)
            } else {
                let from = segments[len - 3].parse::<u64>().unwrap_or(0);
                self.forward_page(&stream, events, from, page_size)
            };

            let body = encode_feed(&feed, format).unwrap();
            return Response::new(StatusCode::OK).with_body(format.media_type(), body);
        }

        if len >= 2 {
            if let Ok(n) = segments[len - 1].parse::<u64>() {
                let stream = segments[..len - 1].join("/");
                let event = inner
                    .streams
                    .get(&stream)
                    .and_then(|s| s.events.get(n as usize));
                return match event {
                    Some(event) => Response::new(StatusCode::OK)
                        .with_body(EVENT_MEDIA_TYPE, encode_event_response(event).unwrap()),
                    None => Response::new(StatusCode::NOT_FOUND),
                };
            }
        }

        Response::new(StatusCode::NOT_FOUND)
    }

    fn backward_page(
        &self,
        stream: &str,
        events: &[EventResponse],
        from: Option<u64>,
        size: u64,
    ) -> Feed {
        let mut links = vec![
            Link::new(Relation::SelfLink, format!("{BASE}/streams/{stream}")),
            Link::new(
                Relation::First,
                format!("{BASE}/streams/{stream}/head/backward/{size}"),
            ),
            Link::new(Relation::Metadata, format!("{BASE}/streams/{stream}/metadata")),
        ];

        let mut page = Vec::new();
        if let Some(last) = (events.len() as u64).checked_sub(1) {
            let upper = from.unwrap_or(last).min(last);
            let lower = (upper + 1).saturating_sub(size);
            page.extend(events[lower as usize..=upper as usize].iter().rev());

            links.push(Link::new(
                Relation::Previous,
                format!("{BASE}/streams/{stream}/{}/forward/{size}", upper + 1),
            ));
            if lower > 0 {
                links.push(Link::new(
                    Relation::Next,
                    format!("{BASE}/streams/{stream}/{}/backward/{size}", lower - 1),
                ));
            }
        }

        self.feed(stream, links, page)
    }

    /// Forward pages list entries newest first, like the real server.
    fn forward_page(&self, stream: &str, events: &[EventResponse], from: u64, size: u64) -> Feed {
        let total = events.len() as u64;
        let mut links = vec![
            Link::new(Relation::SelfLink, format!("{BASE}/streams/{stream}")),
            Link::new(
                Relation::First,
                format!("{BASE}/streams/{stream}/head/backward/{size}"),
            ),
        ];

        let mut page = Vec::new();
        let mut resume = from;
        if from < total {
            let upper = (from + size).min(total);
            page.extend(events[from as usize..upper as usize].iter().rev());
            resume = upper;
        }

        links.push(Link::new(
            Relation::Previous,
            format!("{BASE}/streams/{stream}/{resume}/forward/{size}"),
        ));
        if from > 0 {
            links.push(Link::new(
                Relation::Next,
                format!("{BASE}/streams/{stream}/{}/backward/{size}", from - 1),
            ));
        }

        self.feed(stream, links, page)
    }

    fn feed(&self, stream: &str, links: Vec<Link>, page: Vec<&EventResponse>) -> Feed {
        let author = Author {
            name: "EventStore".to_string(),
        };

        let entries = page
            .into_iter()
            .map(|event| {
                let url = event_url(stream, event.event_number);
                Entry {
                    title: format!("{}@{stream}", event.event_number),
                    id: url.clone(),
                    updated: timestamp(event.event_number),
                    author: author.clone(),
                    summary: event.event.event_type.clone(),
                    links: vec![
                        Link::new(Relation::Edit, url.clone()),
                        Link::new("alternate", url),
                    ],
                    content: self.embed.then(|| event.clone()),
                }
            })
            .collect();

        Feed {
            title: format!("Event stream '{stream}'"),
            id: format!("{BASE}/streams/{stream}"),
            updated: timestamp(0),
            author,
            links,
            entries,
        }
    }
}

fn persist(stream: &str, n: u64, event: Event) -> EventResponse {
    EventResponse {
        event,
        event_number: n,
        links: vec![Link::new(Relation::Edit, event_url(stream, n))],
        timestamp: Some(timestamp(n)),
    }
}

fn append(inner: &mut Inner, request: &Request, stream: &str) -> Response {
    let event: Event = match request
        .body
        .as_ref()
        .and_then(|b| serde_json::from_slice(b).ok())
    {
        Some(event) => event,
        None => return Response::new(StatusCode::BAD_REQUEST),
    };

    let state = inner.streams.entry(stream.to_string()).or_default();
    if state.deleted {
        return Response::new(StatusCode::GONE);
    }

    if let Some(expected) = request.header_str("es-expectedversion") {
        let current = state.events.len() as i64 - 1;
        if expected.parse::<i64>().ok() != Some(current) {
            return Response::new(StatusCode::BAD_REQUEST);
        }
    }

    let n = state.events.len() as u64;
    state.events.push(persist(stream, n, event));

    let mut resp = Response::new(StatusCode::CREATED);
    if let Ok(location) = event_url(stream, n).parse() {
        resp.headers.insert(http::header::LOCATION, location);
    }
    resp
}

fn delete(inner: &mut Inner, stream: &str) -> Response {
    match inner.streams.get_mut(stream) {
        Some(s) if s.deleted => Response::new(StatusCode::GONE),
        Some(s) => {
            s.deleted = true;
            Response::new(StatusCode::NO_CONTENT)
        }
        None => Response::new(StatusCode::NOT_FOUND),
    }
}

#[async_trait]
impl Transport for Simulator {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        {
            let mut inner = self.inner.lock();
            if let Some(kind) = inner.failure {
                inner.requests.push(request);
                return Err(io::Error::new(kind, "simulated transport failure").into());
            }
        }
        Ok(self.handle(&request))
    }
}
