//! Value-level request and response types for the router.
//!
//! The router is transport-free: an embedding server hands it an
//! [`ApiRequest`] built from whatever stack it runs on and writes the
//! returned [`ApiResponse`] back out. Both sides speak the canonical `http`
//! vocabulary (`Method`, `HeaderMap`, `StatusCode`) rather than inventing
//! their own.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde_json::Value;

/// An incoming HTTP request, reduced to what routing needs.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl ApiRequest {
    /// Request with the given method and path, no query, headers, or body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Attach a raw (un-decoded) query string, without the leading `?`.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Attach a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a raw body without touching the content type.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach a JSON body and set `content-type: application/json`.
    #[must_use]
    pub fn with_json_body(mut self, body: &Value) -> Self {
        self.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(Bytes::from(body.to_string()));
        self
    }

    /// The request method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// The request path (no query string).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query string, when present.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// The request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The request body, when present.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// The media type of the body: the `content-type` header value with any
    /// parameters (`; charset=...`) stripped, lowercased.
    #[must_use]
    pub fn media_type(&self) -> Option<String> {
        let value = self.headers.get(CONTENT_TYPE)?.to_str().ok()?;
        let media = value.split(';').next().unwrap_or(value).trim();
        Some(media.to_ascii_lowercase())
    }
}

/// The router's response: status, headers, and a JSON body value.
///
/// Serializing the body onto the wire is the embedding server's concern.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// JSON body value.
    pub body: Value,
}

impl ApiResponse {
    /// Response with the given status and JSON body, no headers.
    #[must_use]
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn media_type_strips_parameters_and_case() {
        let request = ApiRequest::new(Method::POST, "/x").with_header(
            CONTENT_TYPE,
            HeaderValue::from_static("Application/JSON; charset=utf-8"),
        );
        assert_eq!(request.media_type().as_deref(), Some("application/json"));
    }

    #[test]
    fn media_type_absent_without_header() {
        assert_eq!(ApiRequest::new(Method::GET, "/x").media_type(), None);
    }

    #[test]
    fn json_body_sets_content_type() {
        let request = ApiRequest::new(Method::POST, "/x").with_json_body(&json!({"a": 1}));
        assert_eq!(request.media_type().as_deref(), Some("application/json"));
        assert_eq!(request.body().unwrap().as_ref(), br#"{"a":1}"#);
    }
}
