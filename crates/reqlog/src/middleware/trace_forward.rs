//! Trace-forwarding middleware
//!
//! When the trace-forwarding gate is on, wraps the downstream call in an
//! external tracer's span. Tracer construction or invocation failure is
//! absorbed with a warning and never affects the response.

use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use thiserror::Error;

use crate::errors::resolve_status;
use crate::middleware::pipeline::{Middleware, Next, NextFuture};
use crate::request::Request;

/// Failure reported by an external tracer.
#[derive(Error, Debug)]
#[error("tracer failed: {message}")]
pub struct TracerError {
    pub message: String,
}

impl TracerError {
    pub fn new<T: Into<String>>(message: T) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// External tracer capability.
pub trait Tracer: Send + Sync {
    /// Open a span for the request. The returned span is finished with the
    /// response status once the downstream call returns.
    fn start_span(&self, method: &Method, path: &str) -> Result<Box<dyn TraceSpan>, TracerError>;
}

/// An open span handed back by a [`Tracer`].
pub trait TraceSpan: Send {
    fn finish(self: Box<Self>, status: u16) -> Result<(), TracerError>;
}

/// Middleware forwarding request spans to an external tracer.
pub struct TraceForward {
    tracer: Arc<dyn Tracer>,
    enabled: bool,
}

impl TraceForward {
    /// Create with an explicit gate
    pub fn new(tracer: Arc<dyn Tracer>, enabled: bool) -> Self {
        Self { tracer, enabled }
    }

    /// Gate from the `REQLOG_TRACE` environment flag
    pub fn from_env(tracer: Arc<dyn Tracer>) -> Self {
        let enabled = std::env::var("REQLOG_TRACE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Self::new(tracer, enabled)
    }
}

impl fmt::Debug for TraceForward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceForward")
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl Middleware for TraceForward {
    fn handle(&self, request: Request, next: Next) -> NextFuture<'static> {
        let tracer = Arc::clone(&self.tracer);
        let enabled = self.enabled;
        Box::pin(async move {
            if !enabled {
                return next.run(request).await;
            }

            let span = match tracer.start_span(&request.method, request.path()) {
                Ok(span) => Some(span),
                Err(error) => {
                    tracing::warn!(target: "reqlog", "trace span not started: {error}");
                    None
                }
            };

            let outcome = next.run(request).await;

            if let Some(span) = span {
                let status = match &outcome {
                    Ok(response) => response.status_code().as_u16(),
                    Err(error) => resolve_status(error).as_u16(),
                };
                if let Err(error) = span.finish(status) {
                    tracing::warn!(target: "reqlog", "trace span not finished: {error}");
                }
            }

            outcome
        })
    }

    fn name(&self) -> &'static str {
        "TraceForward"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::pipeline::MiddlewarePipeline;
    use crate::response::Response;
    use axum::http::{HeaderMap, StatusCode};
    use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};

    fn request() -> Request {
        Request::new(Method::GET, "/traced".parse().unwrap(), HeaderMap::new())
    }

    #[derive(Default, Clone)]
    struct RecordingTracer {
        started: Arc<AtomicUsize>,
        finished_status: Arc<AtomicU16>,
    }

    struct RecordingSpan {
        finished_status: Arc<AtomicU16>,
    }

    impl Tracer for RecordingTracer {
        fn start_span(
            &self,
            _method: &Method,
            _path: &str,
        ) -> Result<Box<dyn TraceSpan>, TracerError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(RecordingSpan {
                finished_status: Arc::clone(&self.finished_status),
            }))
        }
    }

    impl TraceSpan for RecordingSpan {
        fn finish(self: Box<Self>, status: u16) -> Result<(), TracerError> {
            self.finished_status.store(status, Ordering::SeqCst);
            Ok(())
        }
    }

    struct BrokenTracer;

    impl Tracer for BrokenTracer {
        fn start_span(
            &self,
            _method: &Method,
            _path: &str,
        ) -> Result<Box<dyn TraceSpan>, TracerError> {
            Err(TracerError::new("collector unreachable"))
        }
    }

    #[tokio::test]
    async fn spans_wrap_the_downstream_call() {
        let tracer = RecordingTracer::default();
        let middleware = TraceForward::new(Arc::new(tracer.clone()), true);
        let pipeline = MiddlewarePipeline::new().add(middleware);

        pipeline
            .execute(request(), |_req| {
                Box::pin(async move { Ok(Response::created()) })
            })
            .await
            .unwrap();

        assert_eq!(tracer.started.load(Ordering::SeqCst), 1);
        assert_eq!(tracer.finished_status.load(Ordering::SeqCst), 201);
    }

    #[tokio::test]
    async fn disabled_gate_skips_the_tracer() {
        let tracer = RecordingTracer::default();
        let middleware = TraceForward::new(Arc::new(tracer.clone()), false);
        let pipeline = MiddlewarePipeline::new().add(middleware);

        pipeline
            .execute(request(), |_req| Box::pin(async move { Ok(Response::ok()) }))
            .await
            .unwrap();

        assert_eq!(tracer.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn tracer_failure_never_affects_the_response() {
        let middleware = TraceForward::new(Arc::new(BrokenTracer), true);
        let pipeline = MiddlewarePipeline::new().add(middleware);

        let response = pipeline
            .execute(request(), |_req| {
                Box::pin(async move { Ok(Response::ok().text("fine")) })
            })
            .await
            .unwrap();

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"fine");
    }
}
