//! The structured record emitted once per request

use serde::Serialize;

use crate::errors::Error;

/// One request's structured log record. Field order is the emitted key
/// order; `action` and `status` are never absent, `controller`, `source`
/// and `request_id` may be null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub method: String,
    pub path: String,
    pub format: String,
    pub controller: Option<String>,
    pub source: Option<String>,
    pub action: String,
    pub status: u16,
    pub host: String,
    pub remote_addr: String,
    pub request_id: Option<String>,
    pub total: f64,
    pub db: f64,
    pub db_calls: u64,
    pub params: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionDescriptor>,
}

/// Exception sub-record attached when a failure escaped the downstream
/// chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceptionDescriptor {
    pub class: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backtrace: Option<Vec<String>>,
}

const MAX_BACKTRACE_FRAMES: usize = 10;

impl ExceptionDescriptor {
    /// Describe a captured failure. The backtrace is captured here, at the
    /// point the wrapper observed the failure, and only when the running
    /// environment allows it.
    pub fn from_error(error: &Error, include_backtrace: bool) -> Self {
        Self {
            class: error.class_name().to_string(),
            message: error.to_string(),
            backtrace: include_backtrace.then(capture_backtrace),
        }
    }
}

fn capture_backtrace() -> Vec<String> {
    std::backtrace::Backtrace::force_capture()
        .to_string()
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .take(MAX_BACKTRACE_FRAMES)
        .collect()
}

/// Round a duration in seconds to two decimal places for emission.
pub fn round_seconds(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}
