//! Request logger configuration
//!
//! Resolution order for every knob: per-middleware override, then the
//! host application's framework-level config, then the crate default.
//! [`LoggerOverrides::resolve`] implements the merge.

use std::fmt;
use std::sync::Arc;

use crate::logging::assembler::{DefaultFormatter, RecordFormatter};
use crate::logging::extract::ParamFilter;
use crate::logging::sink::{LogSink, TracingSink};

/// Execution environment. Controls backtrace capture and whether logging
/// failures surface as diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    /// Resolve from `REQLOG_ENV`, falling back to `APP_ENV`, then
    /// development.
    pub fn from_env() -> Self {
        let value = std::env::var("REQLOG_ENV")
            .or_else(|_| std::env::var("APP_ENV"))
            .unwrap_or_default();
        match value.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Configuration consumed by the request logger middleware.
#[derive(Clone)]
pub struct LoggerConfig {
    /// When false the wrapper is a pure passthrough with zero
    /// instrumentation
    pub enabled: bool,
    /// Label emitted records are scoped under when the sink supports
    /// tagging
    pub tag: String,
    pub environment: Environment,
    /// Application root used to derive controller and source names
    pub app_root: Option<String>,
    /// Gate for the trace-forwarding middleware
    pub trace_forwarding: bool,
    pub sink: Arc<dyn LogSink>,
    pub param_filter: Option<Arc<dyn ParamFilter>>,
    pub formatter: Arc<dyn RecordFormatter>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tag: "Reqlog".to_string(),
            environment: Environment::Development,
            app_root: None,
            trace_forwarding: false,
            sink: Arc::new(TracingSink::new()),
            param_filter: None,
            formatter: Arc::new(DefaultFormatter),
        }
    }
}

impl fmt::Debug for LoggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerConfig")
            .field("enabled", &self.enabled)
            .field("tag", &self.tag)
            .field("environment", &self.environment)
            .field("app_root", &self.app_root)
            .field("trace_forwarding", &self.trace_forwarding)
            .field("param_filter", &self.param_filter.is_some())
            .finish()
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with the environment and trace-forwarding gate read from
    /// the process environment (`REQLOG_ENV`/`APP_ENV`, `REQLOG_TRACE`).
    pub fn from_env() -> Self {
        let trace = std::env::var("REQLOG_TRACE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Self {
            environment: Environment::from_env(),
            trace_forwarding: trace,
            ..Self::default()
        }
    }

    /// Builder: disable the middleware entirely
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Builder: set the tag emitted records are scoped under
    pub fn with_tag<T: Into<String>>(mut self, tag: T) -> Self {
        self.tag = tag.into();
        self
    }

    /// Builder: set the execution environment
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Builder: set the application root for controller/source extraction
    pub fn with_app_root<T: Into<String>>(mut self, root: T) -> Self {
        self.app_root = Some(root.into());
        self
    }

    /// Builder: replace the sink
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Builder: install an external parameter filter
    pub fn with_param_filter(mut self, filter: Arc<dyn ParamFilter>) -> Self {
        self.param_filter = Some(filter);
        self
    }

    /// Builder: replace the record formatter
    pub fn with_formatter(mut self, formatter: Arc<dyn RecordFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Backtraces are attached to exception records outside production
    pub fn include_backtrace(&self) -> bool {
        !self.environment.is_production()
    }
}

/// Partial configuration. Unset fields fall through to the framework
/// config, then to the crate default.
#[derive(Clone, Default)]
pub struct LoggerOverrides {
    pub enabled: Option<bool>,
    pub tag: Option<String>,
    pub environment: Option<Environment>,
    pub app_root: Option<String>,
    pub trace_forwarding: Option<bool>,
    pub sink: Option<Arc<dyn LogSink>>,
    pub param_filter: Option<Arc<dyn ParamFilter>>,
    pub formatter: Option<Arc<dyn RecordFormatter>>,
}

impl LoggerOverrides {
    /// Merge this override layer over the framework-level config (when the
    /// host supplies one) over the crate defaults.
    pub fn resolve(self, framework: Option<&LoggerConfig>) -> LoggerConfig {
        let base = framework.cloned().unwrap_or_default();
        LoggerConfig {
            enabled: self.enabled.unwrap_or(base.enabled),
            tag: self.tag.unwrap_or(base.tag),
            environment: self.environment.unwrap_or(base.environment),
            app_root: self.app_root.or(base.app_root),
            trace_forwarding: self.trace_forwarding.unwrap_or(base.trace_forwarding),
            sink: self.sink.unwrap_or(base.sink),
            param_filter: self.param_filter.or(base.param_filter),
            formatter: self.formatter.unwrap_or(base.formatter),
        }
    }
}

impl fmt::Debug for LoggerOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerOverrides")
            .field("enabled", &self.enabled)
            .field("tag", &self.tag)
            .field("environment", &self.environment)
            .finish()
    }
}
