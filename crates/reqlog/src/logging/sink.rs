//! Log sink capability interface
//!
//! A sink exposes leveled writes taking the structured record as an opaque
//! value, plus an optional tagged scope. Sinks without tagging support keep
//! the default `tagged` implementation, which simply runs the block.

use serde_json::Value;
use thiserror::Error;

/// Failure reported by a sink write.
#[derive(Error, Debug)]
#[error("sink write failed: {message}")]
pub struct SinkError {
    pub message: String,
}

impl SinkError {
    pub fn new<T: Into<String>>(message: T) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result type for sink operations
pub type SinkResult = Result<(), SinkError>;

/// Destination for emitted log records.
pub trait LogSink: Send + Sync {
    fn info(&self, record: &Value) -> SinkResult;
    fn warn(&self, record: &Value) -> SinkResult;
    fn error(&self, record: &Value) -> SinkResult;

    /// Run `f` inside a tagged scope. Sinks that cannot scope emission
    /// under a label run the block untagged.
    fn tagged(&self, _tag: &str, f: &mut dyn FnMut() -> SinkResult) -> SinkResult {
        f()
    }
}

/// Default sink: emits through `tracing` with the tag as a span field.
#[derive(Debug, Default, Clone)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for TracingSink {
    fn info(&self, record: &Value) -> SinkResult {
        tracing::info!(target: "reqlog", "{}", record);
        Ok(())
    }

    fn warn(&self, record: &Value) -> SinkResult {
        tracing::warn!(target: "reqlog", "{}", record);
        Ok(())
    }

    fn error(&self, record: &Value) -> SinkResult {
        tracing::error!(target: "reqlog", "{}", record);
        Ok(())
    }

    fn tagged(&self, tag: &str, f: &mut dyn FnMut() -> SinkResult) -> SinkResult {
        let span = tracing::info_span!(target: "reqlog", "request", tag = %tag);
        span.in_scope(|| f())
    }
}

/// In-memory sink that captures records, for tests and assertions.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: std::sync::Mutex<Vec<(String, Value)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured `(level, record)` pairs, oldest first
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn push(&self, level: &str, record: &Value) -> SinkResult {
        self.entries
            .lock()
            .map_err(|_| SinkError::new("memory sink poisoned"))?
            .push((level.to_string(), record.clone()));
        Ok(())
    }
}

impl LogSink for MemorySink {
    fn info(&self, record: &Value) -> SinkResult {
        self.push("info", record)
    }

    fn warn(&self, record: &Value) -> SinkResult {
        self.push("warn", record)
    }

    fn error(&self, record: &Value) -> SinkResult {
        self.push("error", record)
    }
}
