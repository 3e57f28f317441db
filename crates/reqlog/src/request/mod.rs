//! Request abstraction consumed by the middleware chain
//!
//! Wraps `axum::http` types with the parsed-parameter and extension surfaces
//! the logging pipeline reads. Bodies are buffered `Bytes`; the logging
//! fallback that parses a JSON body reads a cheap clone and never disturbs
//! request processing.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Uri};
use serde_json::{Map, Value};

/// HTTP request flowing through the middleware chain.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub path_params: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    body_params: Map<String, Value>,
    body_bytes: Option<Bytes>,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Request {
    /// Create a new request; query parameters are parsed from the URI.
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        let query_params = uri
            .query()
            .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
            .map(|pairs| pairs.into_iter().collect())
            .unwrap_or_default();

        Self {
            method,
            uri,
            headers,
            path_params: HashMap::new(),
            query_params,
            body_params: Map::new(),
            body_bytes: None,
            extensions: HashMap::new(),
        }
    }

    /// Set path parameters extracted from the matched route
    pub fn with_path_params(mut self, params: HashMap<String, String>) -> Self {
        self.path_params = params;
        self
    }

    /// Replace query parameters
    pub fn with_query_params(mut self, params: HashMap<String, String>) -> Self {
        self.query_params = params;
        self
    }

    /// Set parameters the framework already parsed out of the body
    pub fn with_body_params(mut self, params: Map<String, Value>) -> Self {
        self.body_params = params;
        self
    }

    /// Set buffered body bytes
    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body_bytes = Some(body);
        self
    }

    /// Request path
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Header value as a string, when present and valid UTF-8
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Content-Type header value
    pub fn content_type(&self) -> Option<&str> {
        self.header_str("content-type")
    }

    /// Whether the content type is in the JSON family
    /// (`application/json`, `application/vnd.api+json`, ...)
    pub fn is_json(&self) -> bool {
        self.content_type()
            .map(|ct| ct.contains("json"))
            .unwrap_or(false)
    }

    /// Format implied by the request path extension (`/users/1.json` -> `json`)
    pub fn format(&self) -> Option<&str> {
        let last = self.uri.path().rsplit('/').next()?;
        let (_, ext) = last.rsplit_once('.')?;
        (!ext.is_empty()).then_some(ext)
    }

    /// Buffered body bytes, when present
    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body_bytes.as_ref()
    }

    /// Framework-parsed body parameters
    pub fn body_params(&self) -> &Map<String, Value> {
        &self.body_params
    }

    /// Attach a typed extension (for middleware use)
    pub fn insert_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Read a typed extension
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Clone the pieces the logging pipeline reads once the request has been
    /// handed downstream.
    pub fn parts(&self) -> RequestParts {
        RequestParts {
            method: self.method.clone(),
            uri: self.uri.clone(),
            headers: self.headers.clone(),
            path_params: self.path_params.clone(),
            query_params: self.query_params.clone(),
            body_params: self.body_params.clone(),
            body: self.body_bytes.clone(),
        }
    }
}

/// Owned snapshot of request data, captured before the downstream chain
/// consumes the request.
#[derive(Debug, Clone)]
pub struct RequestParts {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub path_params: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    pub body_params: Map<String, Value>,
    pub body: Option<Bytes>,
}

impl RequestParts {
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header_str("content-type")
    }

    pub fn is_json(&self) -> bool {
        self.content_type()
            .map(|ct| ct.contains("json"))
            .unwrap_or(false)
    }

    pub fn format(&self) -> Option<&str> {
        let last = self.uri.path().rsplit('/').next()?;
        let (_, ext) = last.rsplit_once('.')?;
        (!ext.is_empty()).then_some(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> Request {
        Request::new(Method::GET, uri.parse().unwrap(), HeaderMap::new())
    }

    #[test]
    fn query_params_parsed_from_uri() {
        let req = request("/users?page=2&per_page=50");
        assert_eq!(req.query_params.get("page").map(String::as_str), Some("2"));
        assert_eq!(
            req.query_params.get("per_page").map(String::as_str),
            Some("50")
        );
    }

    #[test]
    fn format_from_path_extension() {
        assert_eq!(request("/users/1.json").format(), Some("json"));
        assert_eq!(request("/users/1").format(), None);
        assert_eq!(request("/").format(), None);
    }

    #[test]
    fn json_family_content_types() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/vnd.api+json".parse().unwrap());
        let req = Request::new(Method::POST, "/x".parse().unwrap(), headers);
        assert!(req.is_json());
        assert!(!request("/x").is_json());
    }

    #[test]
    fn typed_extensions_round_trip() {
        #[derive(Debug, PartialEq)]
        struct Marker(u32);

        let mut req = request("/x");
        req.insert_extension(Marker(7));
        assert_eq!(req.extension::<Marker>(), Some(&Marker(7)));
        assert!(req.extension::<String>().is_none());
    }

    #[test]
    fn parts_snapshot_carries_params_and_body() {
        let mut path_params = HashMap::new();
        path_params.insert("id".to_string(), "1".to_string());

        let req = request("/users/1?verbose=1")
            .with_path_params(path_params)
            .with_body(Bytes::from_static(b"{\"name\":\"ada\"}"));
        let parts = req.parts();

        assert_eq!(parts.method, Method::GET);
        assert_eq!(parts.path(), "/users/1");
        assert_eq!(parts.path_params.get("id").map(String::as_str), Some("1"));
        assert!(parts.body.is_some());
    }
}
