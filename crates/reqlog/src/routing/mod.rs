//! Route descriptors consumed by the logging pipeline
//!
//! A [`RouteDescriptor`] is the framework's declaration of a matched
//! endpoint: verb, path template (`/users/:id`), declared parameters,
//! source location, and format negotiation tables. Descriptors are built
//! once at registration time and `Arc`-shared across requests; the `status`
//! slot is reused bookkeeping, which is why consumers must treat a stale
//! success value in it as unreliable.

use std::collections::HashMap;
use std::panic::Location;
use std::sync::atomic::{AtomicU16, Ordering};

use axum::http::Method;

/// Source position of a route declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

/// Declared handler for a request: verb, path template, source location,
/// declared parameters, and content negotiation tables.
#[derive(Debug)]
pub struct RouteDescriptor {
    method: Method,
    path: String,
    params: Vec<String>,
    source: Option<SourceLocation>,
    formats: Vec<String>,
    content_types: HashMap<String, String>,
    // Last response status served through this descriptor. Descriptors are
    // pooled across requests, so this value can be stale.
    status: AtomicU16,
}

impl RouteDescriptor {
    /// Declare a route. The caller's source position is captured as the
    /// route's source location.
    #[track_caller]
    pub fn new<T: Into<String>>(method: Method, path: T) -> Self {
        let caller = Location::caller();
        let path = path.into();
        let params = declared_params(&path);

        Self {
            method,
            path,
            params,
            source: Some(SourceLocation {
                file: caller.file().to_string(),
                line: caller.line(),
            }),
            formats: Vec::new(),
            content_types: HashMap::new(),
            status: AtomicU16::new(0),
        }
    }

    /// Override the captured source location
    pub fn with_source<T: Into<String>>(mut self, file: T, line: u32) -> Self {
        self.source = Some(SourceLocation {
            file: file.into(),
            line,
        });
        self
    }

    /// Drop the source location (routes declared through generated code)
    pub fn without_source(mut self) -> Self {
        self.source = None;
        self
    }

    /// Declare the formats this route serves, first entry is the default
    pub fn with_formats<I, T>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.formats = formats.into_iter().map(Into::into).collect();
        self
    }

    /// Declare the format -> media type table for this route's API
    pub fn with_content_types(mut self, content_types: HashMap<String, String>) -> Self {
        self.content_types = content_types;
        self
    }

    /// Declared HTTP verb
    pub fn verb(&self) -> &Method {
        &self.method
    }

    /// Declared path template
    pub fn path_template(&self) -> &str {
        &self.path
    }

    /// Parameters declared in the path template
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Source position of the declaration, when known
    pub fn source_location(&self) -> Option<&SourceLocation> {
        self.source.as_ref()
    }

    /// Declared formats
    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// Declared format -> media type table
    pub fn content_types(&self) -> &HashMap<String, String> {
        &self.content_types
    }

    /// Format whose declared media type matches the given header value
    pub fn format_for_media_type(&self, header: &str) -> Option<&str> {
        let media = header.split(';').next()?.trim();
        self.content_types
            .iter()
            .find(|(_, declared)| declared.as_str() == media)
            .map(|(format, _)| format.as_str())
    }

    /// Record the status of the response this descriptor last served
    pub fn set_last_status(&self, status: u16) {
        self.status.store(status, Ordering::Relaxed);
    }

    /// Status of the last response served through this descriptor, when one
    /// has been recorded. May be stale across requests.
    pub fn last_status(&self) -> Option<u16> {
        match self.status.load(Ordering::Relaxed) {
            0 => None,
            status => Some(status),
        }
    }
}

fn declared_params(path: &str) -> Vec<String> {
    path.split('/')
        .filter_map(|segment| {
            segment
                .strip_prefix(':')
                .or_else(|| segment.strip_prefix('*'))
        })
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_params_from_template() {
        let route = RouteDescriptor::new(Method::GET, "/users/:id/posts/:post_id");
        assert_eq!(route.params(), ["id", "post_id"]);

        let route = RouteDescriptor::new(Method::GET, "/files/*path");
        assert_eq!(route.params(), ["path"]);

        let route = RouteDescriptor::new(Method::GET, "/health");
        assert!(route.params().is_empty());
    }

    #[test]
    fn source_location_captured_at_declaration() {
        let route = RouteDescriptor::new(Method::GET, "/users");
        let source = route.source_location().unwrap();
        assert!(source.file.ends_with("routing/mod.rs"));
        assert!(source.line > 0);

        let route = RouteDescriptor::new(Method::GET, "/users").without_source();
        assert!(route.source_location().is_none());
    }

    #[test]
    fn status_slot_starts_empty_and_is_reusable() {
        let route = RouteDescriptor::new(Method::GET, "/users");
        assert_eq!(route.last_status(), None);

        route.set_last_status(201);
        assert_eq!(route.last_status(), Some(201));

        route.set_last_status(404);
        assert_eq!(route.last_status(), Some(404));
    }

    #[test]
    fn media_type_lookup_ignores_parameters() {
        let mut content_types = HashMap::new();
        content_types.insert("json".to_string(), "application/json".to_string());
        content_types.insert("xml".to_string(), "application/xml".to_string());
        let route =
            RouteDescriptor::new(Method::POST, "/users").with_content_types(content_types);

        assert_eq!(
            route.format_for_media_type("application/json; charset=utf-8"),
            Some("json")
        );
        assert_eq!(route.format_for_media_type("application/xml"), Some("xml"));
        assert_eq!(route.format_for_media_type("text/html"), None);
    }
}
