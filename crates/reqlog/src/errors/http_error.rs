//! Error types raised by handlers and middleware
//!
//! Every failure that can travel up the middleware chain is an `Error`.
//! Each variant maps to an HTTP status through the table in
//! [`super::status::resolve_status`]; the open `Other` variant carries the
//! typed equivalents of an explicit status override and an options map.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

/// Result type for middleware and handler operations
pub type MiddlewareResult<T> = Result<T, Error>;

/// Failures raised by the downstream chain
#[derive(Error, Debug)]
pub enum Error {
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Resource already exists: {message}")]
    Conflict { message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("No route matched: {path}")]
    RouteNotFound { path: String },

    #[error("Method not allowed: {method}")]
    MethodNotAllowed { method: String },

    #[error("Not implemented: {feature}")]
    NotImplemented { feature: String },

    #[error("Not acceptable: {message}")]
    NotAcceptable { message: String },

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Missing parameter: {name}")]
    MissingParameter { name: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },

    /// Application-defined failure with an optional explicit status and an
    /// options map, the typed rendition of duck-typed error objects.
    #[error("{message}")]
    Other {
        message: String,
        status: Option<u16>,
        options: HashMap<String, Value>,
    },
}

impl Error {
    /// Create a not found error
    pub fn not_found<T: Into<String>>(resource: T) -> Self {
        Error::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict<T: Into<String>>(message: T) -> Self {
        Error::Conflict {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// Create a routing miss error
    pub fn route_not_found<T: Into<String>>(path: T) -> Self {
        Error::RouteNotFound { path: path.into() }
    }

    /// Create a method not allowed error
    pub fn method_not_allowed<T: Into<String>>(method: T) -> Self {
        Error::MethodNotAllowed {
            method: method.into(),
        }
    }

    /// Create a not implemented error
    pub fn not_implemented<T: Into<String>>(feature: T) -> Self {
        Error::NotImplemented {
            feature: feature.into(),
        }
    }

    /// Create a not acceptable error
    pub fn not_acceptable<T: Into<String>>(message: T) -> Self {
        Error::NotAcceptable {
            message: message.into(),
        }
    }

    /// Create a bad request error
    pub fn bad_request<T: Into<String>>(message: T) -> Self {
        Error::BadRequest {
            message: message.into(),
        }
    }

    /// Create a missing parameter error
    pub fn missing_parameter<T: Into<String>>(name: T) -> Self {
        Error::MissingParameter { name: name.into() }
    }

    /// Create an internal error
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Create an application-defined error with no status information
    pub fn other<T: Into<String>>(message: T) -> Self {
        Error::Other {
            message: message.into(),
            status: None,
            options: HashMap::new(),
        }
    }

    /// Create an application-defined error carrying an explicit status
    pub fn with_status<T: Into<String>>(message: T, status: u16) -> Self {
        Error::Other {
            message: message.into(),
            status: Some(status),
            options: HashMap::new(),
        }
    }

    /// Create an application-defined error carrying an options map
    pub fn with_options<T: Into<String>>(message: T, options: HashMap<String, Value>) -> Self {
        Error::Other {
            message: message.into(),
            status: None,
            options,
        }
    }

    /// Explicit status attached to the failure, when one exists
    pub fn status_override(&self) -> Option<u16> {
        match self {
            Error::Other { status, .. } => *status,
            _ => None,
        }
    }

    /// Options map attached to the failure, when one exists
    pub fn options(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Error::Other { options, .. } if !options.is_empty() => Some(options),
            _ => None,
        }
    }

    /// Short type name used in emitted exception records
    pub fn class_name(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "NotFound",
            Error::Conflict { .. } => "Conflict",
            Error::Validation { .. } => "Validation",
            Error::RouteNotFound { .. } => "RouteNotFound",
            Error::MethodNotAllowed { .. } => "MethodNotAllowed",
            Error::NotImplemented { .. } => "NotImplemented",
            Error::NotAcceptable { .. } => "NotAcceptable",
            Error::BadRequest { .. } => "BadRequest",
            Error::MissingParameter { .. } => "MissingParameter",
            Error::Internal { .. } => "Internal",
            Error::Other { .. } => "Other",
        }
    }
}
