//! Read-only request view handed to handlers and controllers.
//!
//! # Responsibilities
//! - Buffer the body once, up to the configured limit
//! - Expose method, path, query, headers, cookies and body
//! - Decode query strings, form bodies and JSON bodies on demand
//!
//! # Design Decisions
//! - Owned and `Send` so dispatch can run on the blocking pool
//! - Cookies are parsed from the `Cookie` header; session storage itself
//!   belongs to an outer collaborator

use std::collections::BTreeMap;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, StatusCode};
use http_body_util::LengthLimitError;
use serde::de::DeserializeOwned;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),
}

impl RequestError {
    /// Classify a buffering failure: only the length limit is a 413.
    fn from_body(err: axum::Error, limit: usize) -> Self {
        let mut cause = std::error::Error::source(&err);
        while let Some(inner) = cause {
            if inner.is::<LengthLimitError>() {
                return Self::BodyTooLarge(limit);
            }
            cause = inner.source();
        }
        Self::Body(err)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Body(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// An incoming request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    cookies: BTreeMap<String, String>,
    body: Bytes,
}

impl Request {
    /// Build a request directly (tests, internal sub-requests).
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (target.to_string(), None),
        };
        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            cookies: BTreeMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.cookies = parse_cookies(&headers);
        self.headers = headers;
        self
    }

    /// Convert an axum request, buffering at most `limit` body bytes.
    pub async fn from_http(
        request: axum::http::Request<Body>,
        limit: usize,
    ) -> Result<Self, RequestError> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, limit)
            .await
            .map_err(|err| RequestError::from_body(err, limit))?;
        Ok(Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            cookies: parse_cookies(&parts.headers),
            headers: parts.headers,
            body,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Raw request path, without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// First value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn request_id(&self) -> &str {
        self.header(X_REQUEST_ID).unwrap_or("unknown")
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decode an `application/x-www-form-urlencoded` body.
    pub fn form(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(&self.body).into_owned().collect()
    }

    /// Decode a JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

fn parse_cookies(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_new_splits_query() {
        let request = Request::new(Method::GET, "/students/list?page=2&sort=name%20asc");
        assert_eq!(request.path(), "/students/list");
        assert_eq!(request.query_param("page").as_deref(), Some("2"));
        assert_eq!(request.query_param("sort").as_deref(), Some("name asc"));
        assert!(request.query_param("missing").is_none());
    }

    #[test]
    fn test_form_and_json_bodies() {
        let form = Request::new(Method::POST, "/login").with_body("user=ada&pass=x%26y");
        assert_eq!(
            form.form(),
            vec![("user".to_string(), "ada".to_string()), ("pass".to_string(), "x&y".to_string())]
        );

        let json = Request::new(Method::POST, "/api").with_body(r#"{"grade": 9}"#);
        let value: serde_json::Value = json.json().unwrap();
        assert_eq!(value["grade"], 9);
    }

    #[test]
    fn test_cookies_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("sid=abc123; theme=dark"));
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("req-1"));
        let request = Request::new(Method::GET, "/").with_headers(headers);

        assert_eq!(request.cookie("sid"), Some("abc123"));
        assert_eq!(request.cookie("theme"), Some("dark"));
        assert_eq!(request.request_id(), "req-1");
    }

    #[tokio::test]
    async fn test_from_http_enforces_limit() {
        let http = axum::http::Request::builder()
            .method("POST")
            .uri("/upload?x=1")
            .body(Body::from(vec![0u8; 64]))
            .unwrap();
        let err = Request::from_http(http, 16).await.unwrap_err();
        assert!(matches!(err, RequestError::BodyTooLarge(16)));
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let http = axum::http::Request::builder()
            .uri("/upload?x=1")
            .body(Body::from("ok"))
            .unwrap();
        let request = Request::from_http(http, 16).await.unwrap();
        assert_eq!(request.path(), "/upload");
        assert_eq!(request.query(), Some("x=1"));
        assert_eq!(request.body().as_ref(), b"ok");
    }

    #[tokio::test]
    async fn test_aborted_body_is_a_bad_request() {
        let (sender, body) = http_body_util::channel::Channel::<Bytes, std::io::Error>::new(1);
        sender.abort(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "client went away",
        ));
        let http = axum::http::Request::builder()
            .method("POST")
            .uri("/upload")
            .body(Body::new(body))
            .unwrap();

        let err = Request::from_http(http, 1024).await.unwrap_err();
        assert!(matches!(err, RequestError::Body(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
