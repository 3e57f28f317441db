//! Error handling middleware
//!
//! Converts failures raised by inner stages into final error responses and
//! records the resolved status on the request's processing record. Placed
//! inside the request logger, it guarantees the logger observes a finished
//! response for every failure handled here; only failures raised by this
//! middleware's own callers escape to the logger's error path.

use serde_json::json;

use crate::context::SharedRecord;
use crate::errors::resolve_status;
use crate::middleware::pipeline::{Middleware, Next, NextFuture};
use crate::request::Request;
use crate::response::Response;

/// Error handling middleware configuration
#[derive(Debug, Clone)]
pub struct ErrorHandlerConfig {
    /// Include failure detail in response bodies (development only)
    pub include_details: bool,

    /// Emit a diagnostic for each converted failure
    pub log_errors: bool,
}

impl Default for ErrorHandlerConfig {
    fn default() -> Self {
        Self {
            include_details: cfg!(debug_assertions),
            log_errors: true,
        }
    }
}

/// Error handling middleware
#[derive(Debug, Default)]
pub struct ErrorHandler {
    config: ErrorHandlerConfig,
}

impl ErrorHandler {
    /// Create with default config
    pub fn new() -> Self {
        Self {
            config: ErrorHandlerConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(config: ErrorHandlerConfig) -> Self {
        Self { config }
    }

    /// Include failure detail in responses (use only in development)
    pub fn with_details(mut self, include: bool) -> Self {
        self.config.include_details = include;
        self
    }
}

impl Middleware for ErrorHandler {
    fn handle(&self, request: Request, next: Next) -> NextFuture<'static> {
        let config = self.config.clone();
        Box::pin(async move {
            let record = request.extension::<SharedRecord>().cloned();

            match next.run(request).await {
                Ok(response) => Ok(response),
                Err(error) => {
                    let status = resolve_status(&error);
                    if let Some(record) = record {
                        record.set_status(status.as_u16());
                    }
                    if config.log_errors {
                        tracing::debug!(
                            target: "reqlog",
                            "converted {} failure into {} response",
                            error.class_name(),
                            status
                        );
                    }

                    let message = if config.include_details {
                        error.to_string()
                    } else {
                        status
                            .canonical_reason()
                            .unwrap_or("request failed")
                            .to_string()
                    };
                    Ok(Response::with_status(status).json_value(json!({
                        "error": {
                            "code": status.as_u16(),
                            "message": message
                        }
                    })))
                }
            }
        })
    }

    fn name(&self) -> &'static str {
        "ErrorHandler"
    }
}
