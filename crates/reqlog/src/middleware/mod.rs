//! Middleware chain and built-in stages
//!
//! The chain uses the handle(request, next) pattern; stages are registered
//! explicitly on a [`MiddlewarePipeline`] in execution order. The built-in
//! stages are the request logger, the error handler, and the optional
//! trace forwarder.

pub mod error_handler;
pub mod logger;
pub mod pipeline;
pub mod trace_forward;

pub use error_handler::{ErrorHandler, ErrorHandlerConfig};
pub use logger::RequestLogger;
pub use pipeline::{Middleware, MiddlewarePipeline, Next, NextFuture};
pub use trace_forward::{TraceForward, TraceSpan, Tracer, TracerError};
