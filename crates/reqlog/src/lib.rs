//! # reqlog
//!
//! Structured request logging middleware for axum-based Rust web services.
//!
//! The crate wraps request execution and emits one structured record per
//! request with:
//! - timing for the whole request and for database sub-operations,
//!   accumulated per execution context
//! - route metadata (action, controller, source location) derived from the
//!   matched route descriptor
//! - sanitized request parameters with depth and size bounds
//! - a tiered failure-safe emit path, so logging failures never change the
//!   response delivered to the client
//!
//! ```no_run
//! use reqlog::{ErrorHandler, MiddlewarePipeline, RequestLogger, Response};
//!
//! # async fn demo(request: reqlog::Request) -> reqlog::MiddlewareResult<Response> {
//! let pipeline = MiddlewarePipeline::new()
//!     .add(RequestLogger::new())
//!     .add(ErrorHandler::new());
//!
//! pipeline
//!     .execute(request, |_req| {
//!         Box::pin(async move { Ok(Response::ok().text("hello")) })
//!     })
//!     .await
//! # }
//! ```

// Core modules
pub mod config;
pub mod context;
pub mod errors;
pub mod logging;
pub mod middleware;
pub mod request;
pub mod response;
pub mod routing;
pub mod timing;

// Main API
pub use config::{Environment, LoggerConfig, LoggerOverrides};
pub use errors::{resolve_status, Error, MiddlewareResult};

// Re-export request/response types
pub use request::{Request, RequestParts};
pub use response::Response;

// Re-export routing types
pub use routing::{RouteDescriptor, SourceLocation};

// Re-export context types
pub use context::{LogContext, RequestRecord, SharedRecord, SharedRoute};

// Re-export middleware types
pub use middleware::{
    ErrorHandler, ErrorHandlerConfig, Middleware, MiddlewarePipeline, Next, NextFuture,
    RequestLogger, TraceForward, TraceSpan, Tracer, TracerError,
};

// Re-export logging types
pub use logging::{
    init_logging, DefaultFormatter, ExceptionDescriptor, LogRecord, LogSink, LoggingConfig,
    MemorySink, ParamFilter, RecordFormatter, SinkError, SinkResult, TracingSink,
};

// Re-export timing types
pub use timing::DbTimings;
