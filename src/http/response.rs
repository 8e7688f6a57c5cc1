//! Response writer used by handlers and controllers.
//!
//! # Responsibilities
//! - Accumulate the body written by an action
//! - Set status and headers
//! - Redirect and JSON helpers
//!
//! # Design Decisions
//! - Body defaults to `text/html; charset=utf-8`
//! - Converted into an axum response only at the transport boundary

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde::Serialize;

const HTML: &str = "text/html; charset=utf-8";

/// Outgoing response.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl Default for Response {
    fn default() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(HTML));
        Self {
            status: StatusCode::OK,
            headers,
            body: String::new(),
        }
    }
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain-text response with the given status.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        let mut response = Self::new();
        response.status = status;
        response.set_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response.body = body.into();
        response
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Append to the body.
    pub fn write(&mut self, text: &str) -> &mut Self {
        self.body.push_str(text);
        self
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: impl Into<String>) -> &mut Self {
        self.body = body.into();
        self
    }

    /// Turn this into a `302 Found` redirect to `location`. Locations that
    /// are not valid header values fall back to `/`.
    pub fn redirect(&mut self, location: &str) -> &mut Self {
        let value = HeaderValue::from_str(location).unwrap_or_else(|_| {
            tracing::warn!(location, "Invalid redirect location, using /");
            HeaderValue::from_static("/")
        });
        self.status = StatusCode::FOUND;
        self.headers.insert(header::LOCATION, value);
        self.body.clear();
        self
    }

    /// Replace the body with `value` serialized as JSON.
    pub fn json<T: Serialize>(&mut self, value: &T) -> Result<&mut Self, serde_json::Error> {
        self.body = serde_json::to_string(value)?;
        self.headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.headers, self.body).into_response()
    }
}
