//! Pending response state shared by responders and output filters.

use std::time::SystemTime;

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use chrono::{DateTime, Utc};
use mdr_config::OutputMode;

use crate::chain::BufferChain;

/// Content type of raw markdown.
pub const TEXT_PLAIN: &str = "text/plain";
/// Content type of raw markdown with an explicit charset.
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=\"UTF-8\"";
/// Content type of rendered HTML.
pub const TEXT_HTML: &str = "text/html";
/// Content type of rendered HTML with an explicit charset.
pub const TEXT_HTML_UTF8: &str = "text/html; charset=\"UTF-8\"";

/// Content type advertised for a markdown route.
#[must_use]
pub fn content_type_for(mode: OutputMode, utf8: bool) -> &'static str {
    match (mode, utf8) {
        (OutputMode::Raw, false) => TEXT_PLAIN,
        (OutputMode::Raw, true) => TEXT_PLAIN_UTF8,
        (OutputMode::Html, false) => TEXT_HTML,
        (OutputMode::Html, true) => TEXT_HTML_UTF8,
    }
}

/// Status line and headers of a response that has not been sent yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseMetadata {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    /// Whether the response advertises `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    pub content_range: Option<String>,
    pub last_modified: Option<SystemTime>,
}

impl Default for ResponseMetadata {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            content_type: None,
            content_length: None,
            accept_ranges: false,
            content_range: None,
            last_modified: None,
        }
    }
}

impl ResponseMetadata {
    pub fn set_content_type(&mut self, value: impl Into<String>) {
        self.content_type = Some(value.into());
    }

    pub fn clear_content_length(&mut self) {
        self.content_length = None;
    }

    pub fn clear_accept_ranges(&mut self) {
        self.accept_ranges = false;
    }

    /// Turn the metadata into a response carrying `body`.
    #[must_use]
    pub fn into_response(self, body: Body) -> Response {
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        let headers = response.headers_mut();

        if let Some(content_type) = self.content_type {
            match HeaderValue::try_from(content_type) {
                Ok(value) => {
                    headers.insert(header::CONTENT_TYPE, value);
                }
                Err(e) => tracing::warn!(error = %e, "Dropping invalid content type"),
            }
        }
        if let Some(len) = self.content_length {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        }
        if self.accept_ranges {
            headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        }
        if let Some(range) = self.content_range
            && let Ok(value) = HeaderValue::try_from(range)
        {
            headers.insert(header::CONTENT_RANGE, value);
        }
        if let Some(modified) = self.last_modified
            && let Ok(value) = HeaderValue::try_from(http_date(modified))
        {
            headers.insert(header::LAST_MODIFIED, value);
        }

        response
    }
}

/// Format a timestamp as an HTTP date.
pub(crate) fn http_date(time: SystemTime) -> String {
    let time: DateTime<Utc> = time.into();
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// A response produced by a responder, before the output pipeline ran.
#[derive(Debug)]
pub struct HostResponse {
    pub meta: ResponseMetadata,
    /// Body batches in the order they are handed to the body stages.
    pub batches: Vec<BufferChain>,
    /// The responder decided there is no body to send (HEAD).
    pub header_only: bool,
}

impl HostResponse {
    #[must_use]
    pub fn new(meta: ResponseMetadata, batches: Vec<BufferChain>) -> Self {
        Self {
            meta,
            batches,
            header_only: false,
        }
    }

    #[must_use]
    pub fn header_only(meta: ResponseMetadata) -> Self {
        Self {
            meta,
            batches: Vec::new(),
            header_only: true,
        }
    }
}
