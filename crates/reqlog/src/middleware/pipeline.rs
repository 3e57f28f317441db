//! Middleware chain with the handle(request, next) pattern
//!
//! The chain is composed explicitly: middleware are named stages added to a
//! [`MiddlewarePipeline`] in execution order, and each stage decides whether
//! to call the remainder through [`Next`]. A stage returns the downstream
//! response or propagates the downstream failure; nothing is patched into
//! the host at runtime.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::MiddlewareResult;
use crate::request::Request;
use crate::response::Response;

/// Type alias for the boxed future middleware stages return
pub type NextFuture<'a> = Pin<Box<dyn Future<Output = MiddlewareResult<Response>> + Send + 'a>>;

/// The rest of the middleware chain
pub struct Next {
    handler: Box<dyn FnOnce(Request) -> NextFuture<'static> + Send>,
}

impl Next {
    /// Create a new Next with a handler function
    pub fn new<F>(handler: F) -> Self
    where
        F: FnOnce(Request) -> NextFuture<'static> + Send + 'static,
    {
        Self {
            handler: Box::new(handler),
        }
    }

    /// Run the rest of the chain with the given request
    pub async fn run(self, request: Request) -> MiddlewareResult<Response> {
        (self.handler)(request).await
    }
}

/// Middleware stage. Uses boxed futures to stay dyn-compatible.
pub trait Middleware: Send + Sync + std::fmt::Debug {
    /// Handle the request and call the next stage in the chain
    fn handle(&self, request: Request, next: Next) -> NextFuture<'static>;

    /// Optional middleware name for debugging
    fn name(&self) -> &'static str {
        "Middleware"
    }
}

/// Statically composed middleware pipeline
#[derive(Debug, Default)]
pub struct MiddlewarePipeline {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl MiddlewarePipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            middleware: Vec::new(),
        }
    }

    /// Add middleware to the pipeline
    pub fn add<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Add middleware to the pipeline (mutable version)
    pub fn add_mut<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middleware.push(Arc::new(middleware));
    }

    /// Add an already-shared middleware to the pipeline
    pub fn add_shared(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Extend this pipeline with another's stages; this pipeline's stages
    /// execute first
    pub fn extend(mut self, other: Self) -> Self {
        self.middleware.extend(other.middleware);
        self
    }

    /// Execute the pipeline around a terminal handler
    pub async fn execute<F, Fut>(&self, request: Request, handler: F) -> MiddlewareResult<Response>
    where
        F: FnOnce(Request) -> Fut + Send + 'static,
        Fut: Future<Output = MiddlewareResult<Response>> + Send + 'static,
    {
        let mut chain = Box::new(move |req: Request| Box::pin(handler(req)) as NextFuture<'static>)
            as Box<dyn FnOnce(Request) -> NextFuture<'static> + Send>;

        for middleware in self.middleware.iter().rev() {
            let middleware = middleware.clone();
            let next_handler = chain;
            chain = Box::new(move |req: Request| {
                let next = Next::new(next_handler);
                middleware.handle(req, next)
            });
        }

        chain(request).await
    }

    /// Number of stages in the pipeline
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    /// Whether the pipeline has no stages
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Stage names for debugging
    pub fn names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }
}

impl Clone for MiddlewarePipeline {
    fn clone(&self) -> Self {
        Self {
            middleware: self.middleware.clone(),
        }
    }
}

impl From<Vec<Arc<dyn Middleware>>> for MiddlewarePipeline {
    fn from(middleware: Vec<Arc<dyn Middleware>>) -> Self {
        Self { middleware }
    }
}
