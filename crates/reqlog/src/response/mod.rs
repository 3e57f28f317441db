//! Response abstraction returned by the middleware chain

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use serde_json::Value;

/// HTTP response produced by the downstream chain.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Create an empty 200 response
    pub fn ok() -> Self {
        Self::with_status(StatusCode::OK)
    }

    /// Create an empty response with the given status
    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Create an empty 201 response
    pub fn created() -> Self {
        Self::with_status(StatusCode::CREATED)
    }

    /// Set a plain text body
    pub fn text<T: Into<String>>(mut self, body: T) -> Self {
        if let Ok(value) = "text/plain".parse() {
            self.headers.insert("content-type", value);
        }
        self.body = Bytes::from(body.into());
        self
    }

    /// Set a JSON body from a serialized value
    pub fn json_value(mut self, value: Value) -> Self {
        if let Ok(header) = "application/json".parse() {
            self.headers.insert("content-type", header);
        }
        self.body = Bytes::from(value.to_string());
        self
    }

    /// Response status
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Add a header (for middleware use)
    pub fn add_header(&mut self, name: &'static str, value: &str) {
        if let Ok(parsed) = value.parse() {
            self.headers.insert(name, parsed);
        }
    }

    /// Response body bytes
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}
