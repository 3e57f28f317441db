//! Request logger middleware
//!
//! Wraps the downstream chain and emits one structured record per request.
//! The chain runs to completion before any metadata capture, so the values
//! the record carries are post-error-handling. The downstream outcome,
//! response or failure, is returned to the caller unchanged regardless of
//! logging outcome; a failure the in-chain error handler did not absorb is
//! logged with a derived status and then re-raised.

use std::sync::Arc;
use std::time::Instant;

use crate::config::{LoggerConfig, LoggerOverrides};
use crate::context::{LogContext, RequestRecord, SharedRecord, SharedRoute};
use crate::errors::resolve_status;
use crate::logging::assembler;
use crate::middleware::pipeline::{Middleware, Next, NextFuture};
use crate::request::Request;
use crate::timing;

/// Middleware emitting one structured log record per request.
#[derive(Debug)]
pub struct RequestLogger {
    config: LoggerConfig,
}

impl RequestLogger {
    /// Create with the crate default configuration
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
        }
    }

    /// Create with an explicit configuration
    pub fn with_config(config: LoggerConfig) -> Self {
        Self { config }
    }

    /// Create from per-middleware overrides layered over the host
    /// framework's config
    pub fn resolved(overrides: LoggerOverrides, framework: Option<&LoggerConfig>) -> Self {
        Self {
            config: overrides.resolve(framework),
        }
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }
}

impl Default for RequestLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for RequestLogger {
    fn handle(&self, mut request: Request, next: Next) -> NextFuture<'static> {
        let config = self.config.clone();
        Box::pin(async move {
            if !config.enabled {
                return next.run(request).await;
            }

            let started = Instant::now();
            let record: SharedRecord = Arc::new(RequestRecord::new());
            request.insert_extension(Arc::clone(&record));

            let route: Option<SharedRoute> = request.extension::<SharedRoute>().cloned();
            let parts = request.parts();

            // The downstream chain runs inside a fresh timing scope; the
            // snapshot is read before the scope ends.
            let (outcome, db) = timing::scope(async {
                timing::reset();
                let outcome = next.run(request).await;
                (outcome, timing::snapshot())
            })
            .await;

            // Duration is captured before emission, so sink latency is
            // never charged to the request.
            let total = started.elapsed();

            match outcome {
                Ok(response) => {
                    let ctx = LogContext {
                        request: &parts,
                        route: route.as_deref(),
                        response: Some(&response),
                        error: None,
                        record: &record,
                    };
                    assembler::log_request(&ctx, &config, db, total);
                    if let Some(route) = route.as_deref() {
                        route.set_last_status(response.status_code().as_u16());
                    }
                    Ok(response)
                }
                Err(error) => {
                    record.set_status(resolve_status(&error).as_u16());
                    let ctx = LogContext {
                        request: &parts,
                        route: route.as_deref(),
                        response: None,
                        error: Some(&error),
                        record: &record,
                    };
                    assembler::log_request(&ctx, &config, db, total);
                    Err(error)
                }
            }
        })
    }

    fn name(&self) -> &'static str {
        "RequestLogger"
    }
}
