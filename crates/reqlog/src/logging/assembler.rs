//! Record assembly and the tiered failure-safe emit path
//!
//! The primary path builds the full [`LogRecord`] from the extractors and
//! emits it through the sink's tagged scope. A primary failure is reported
//! as an [`EmitFailure`] whose `attempted` flag tells the caller whether a
//! sink write may already have happened; re-emission after an attempted
//! write is forbidden. When the primary path failed before any write, a
//! fallback reconstructs a minimal record straight from raw request parts
//! and tries exactly once; its own failure is swallowed.

use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::config::LoggerConfig;
use crate::context::LogContext;
use crate::errors::{resolve_status, Error};
use crate::logging::extract;
use crate::logging::record::{round_seconds, ExceptionDescriptor, LogRecord};
use crate::request::RequestParts;
use crate::timing::DbTimings;

/// Serialization hook for emitted records. The host application can
/// install its own implementation through the config.
pub trait RecordFormatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> Result<Value, serde_json::Error>;
}

/// Default formatter: the record's own serde representation.
#[derive(Debug, Default, Clone)]
pub struct DefaultFormatter;

impl RecordFormatter for DefaultFormatter {
    fn format(&self, record: &LogRecord) -> Result<Value, serde_json::Error> {
        serde_json::to_value(record)
    }
}

/// Failure of the primary emit path. `attempted` is true when a sink write
/// may already have happened; the caller must not retry in that case.
#[derive(Debug)]
pub struct EmitFailure {
    pub attempted: bool,
    pub message: String,
}

/// Combine extraction outputs, timing, and any captured failure into the
/// record. Building never fails; each extractor degrades independently.
pub fn build(
    ctx: &LogContext<'_>,
    config: &LoggerConfig,
    db: DbTimings,
    total: Duration,
) -> LogRecord {
    let app_root = config.app_root.as_deref();
    let params = extract::filter_params(
        extract::params(ctx.request),
        config.param_filter.as_deref(),
    );

    LogRecord {
        method: ctx.request.method.to_string(),
        path: ctx.request.path().to_string(),
        format: extract::format(ctx),
        controller: extract::controller(ctx.route, app_root),
        source: extract::source_location(ctx.route, app_root),
        action: extract::action(ctx.route),
        status: extract::status(ctx),
        host: extract::host(ctx.request),
        remote_addr: extract::remote_addr(ctx.request),
        request_id: extract::request_id(ctx.request),
        total: round_seconds(total.as_secs_f64()),
        db: round_seconds(db.duration),
        db_calls: db.count,
        params,
        exception: ctx
            .error
            .map(|error| ExceptionDescriptor::from_error(error, config.include_backtrace())),
    }
}

/// Emit one record through the sink's tagged scope. Error level when an
/// exception is attached, info otherwise.
pub fn emit(record: &LogRecord, config: &LoggerConfig) -> Result<(), EmitFailure> {
    let value = config.formatter.format(record).map_err(|e| EmitFailure {
        attempted: false,
        message: e.to_string(),
    })?;

    let sink = config.sink.as_ref();
    let is_error = record.exception.is_some();
    sink.tagged(&config.tag, &mut || {
        if is_error {
            sink.error(&value)
        } else {
            sink.info(&value)
        }
    })
    .map_err(|e| EmitFailure {
        attempted: true,
        message: e.to_string(),
    })
}

/// Assemble and emit the record for one request. Nothing escapes to the
/// wrapper: a primary failure after a write attempt is final (no duplicate
/// emission), a failure before any write falls back to the minimal path.
pub fn log_request(ctx: &LogContext<'_>, config: &LoggerConfig, db: DbTimings, total: Duration) {
    let record = build(ctx, config, db, total);
    match emit(&record, config) {
        Ok(()) => ctx.record.mark_logged(),
        Err(failure) => {
            if !config.environment.is_production() {
                tracing::warn!(
                    target: "reqlog",
                    request = %ctx.record.id(),
                    "request log emission failed: {}",
                    failure.message
                );
            }
            if !failure.attempted && !ctx.record.is_logged() {
                emit_fallback(ctx.request, ctx.error, config);
            }
        }
    }
}

/// Last-resort emission: a minimal record read straight off the raw request
/// parts, one write, failure swallowed.
pub fn emit_fallback(parts: &RequestParts, error: Option<&Error>, config: &LoggerConfig) {
    let mut entry = Map::new();
    entry.insert("timestamp".to_string(), json!(Utc::now().to_rfc3339()));
    entry.insert("method".to_string(), json!(parts.method.as_str()));
    entry.insert("path".to_string(), json!(parts.uri.path()));
    if let Some(host) = parts.headers.get("host").and_then(|v| v.to_str().ok()) {
        entry.insert("host".to_string(), json!(host));
    }
    if let Some(addr) = parts
        .headers
        .get("x-forwarded-for")
        .or_else(|| parts.headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
    {
        entry.insert("remote_addr".to_string(), json!(addr));
    }
    if let Some(id) = parts.headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        entry.insert("request_id".to_string(), json!(id));
    }
    if let Some(error) = error {
        entry.insert("status".to_string(), json!(resolve_status(error).as_u16()));
        entry.insert(
            "exception".to_string(),
            json!({"class": error.class_name(), "message": error.to_string()}),
        );
    }

    let value = Value::Object(entry);
    let sink = config.sink.as_ref();
    let _ = sink.tagged(&config.tag, &mut || {
        if error.is_some() {
            sink.error(&value)
        } else {
            sink.info(&value)
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestRecord;
    use crate::logging::sink::{LogSink, SinkError, SinkResult};
    use crate::request::Request;
    use crate::response::Response;
    use crate::routing::RouteDescriptor;
    use axum::http::{HeaderMap, Method, StatusCode};
    use std::sync::{Arc, Mutex};

    /// Sink capturing writes, optionally failing every write.
    #[derive(Default)]
    struct CaptureSink {
        writes: Mutex<Vec<(String, Value)>>,
        tags: Mutex<Vec<String>>,
        attempts: Mutex<usize>,
        fail: bool,
    }

    impl CaptureSink {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn written(&self) -> Vec<(String, Value)> {
            self.writes.lock().unwrap().clone()
        }

        fn attempts(&self) -> usize {
            *self.attempts.lock().unwrap()
        }

        fn write(&self, level: &str, record: &Value) -> SinkResult {
            *self.attempts.lock().unwrap() += 1;
            if self.fail {
                return Err(SinkError::new("broken sink"));
            }
            self.writes
                .lock()
                .unwrap()
                .push((level.to_string(), record.clone()));
            Ok(())
        }
    }

    impl LogSink for CaptureSink {
        fn info(&self, record: &Value) -> SinkResult {
            self.write("info", record)
        }
        fn warn(&self, record: &Value) -> SinkResult {
            self.write("warn", record)
        }
        fn error(&self, record: &Value) -> SinkResult {
            self.write("error", record)
        }
        fn tagged(&self, tag: &str, f: &mut dyn FnMut() -> SinkResult) -> SinkResult {
            self.tags.lock().unwrap().push(tag.to_string());
            f()
        }
    }

    /// Formatter that always fails, before any sink write.
    struct BrokenFormatter;

    impl RecordFormatter for BrokenFormatter {
        fn format(&self, _record: &LogRecord) -> Result<Value, serde_json::Error> {
            serde_json::from_str::<Value>("not json").map(|_| Value::Null)
        }
    }

    fn scenario_context() -> (Request, Arc<RouteDescriptor>, Response, RequestRecord) {
        let request = Request::new(
            Method::GET,
            "/users/1".parse().unwrap(),
            HeaderMap::new(),
        );
        let route = Arc::new(
            RouteDescriptor::new(Method::GET, "/users/:id")
                .with_source("/srv/app/src/api/users.rs", 123),
        );
        let response = Response::created();
        (request, route, response, RequestRecord::new())
    }

    #[test]
    fn build_combines_extraction_and_timing() {
        let (request, route, response, record) = scenario_context();
        let parts = request.parts();
        let ctx = LogContext {
            request: &parts,
            route: Some(&route),
            response: Some(&response),
            error: None,
            record: &record,
        };
        let config = LoggerConfig::default().with_app_root("/srv/app");

        let built = build(
            &ctx,
            &config,
            DbTimings {
                duration: 12.34,
                count: 2,
            },
            Duration::from_millis(15_250),
        );

        assert_eq!(built.status, 201);
        assert_eq!(built.action, "get_users_id");
        assert_eq!(built.controller.as_deref(), Some("Users"));
        assert_eq!(built.source.as_deref(), Some("src/api/users.rs:123"));
        assert_eq!(built.db, 12.34);
        assert_eq!(built.db_calls, 2);
        assert_eq!(built.total, 15.25);
        assert!(built.exception.is_none());
    }

    #[test]
    fn emit_uses_error_level_for_failures() {
        let sink = Arc::new(CaptureSink::default());
        let config = LoggerConfig::default().with_sink(sink.clone());

        let (request, route, _, record) = scenario_context();
        let parts = request.parts();
        let error = Error::internal("boom");
        let ctx = LogContext {
            request: &parts,
            route: Some(&route),
            response: None,
            error: Some(&error),
            record: &record,
        };

        let built = build(&ctx, &config, DbTimings::default(), Duration::ZERO);
        emit(&built, &config).unwrap();

        let written = sink.written();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, "error");
        assert_eq!(written[0].1["exception"]["class"], "Internal");
        assert_eq!(sink.tags.lock().unwrap().clone(), vec!["Reqlog".to_string()]);
    }

    #[test]
    fn sink_failure_is_marked_attempted() {
        let sink = Arc::new(CaptureSink::failing());
        let config = LoggerConfig::default().with_sink(sink);

        let (request, route, response, record) = scenario_context();
        let parts = request.parts();
        let ctx = LogContext {
            request: &parts,
            route: Some(&route),
            response: Some(&response),
            error: None,
            record: &record,
        };

        let built = build(&ctx, &config, DbTimings::default(), Duration::ZERO);
        let failure = emit(&built, &config).unwrap_err();
        assert!(failure.attempted);
    }

    #[test]
    fn log_request_marks_record_logged() {
        let sink = Arc::new(CaptureSink::default());
        let config = LoggerConfig::default().with_sink(sink.clone());

        let (request, route, response, record) = scenario_context();
        let parts = request.parts();
        let ctx = LogContext {
            request: &parts,
            route: Some(&route),
            response: Some(&response),
            error: None,
            record: &record,
        };

        log_request(&ctx, &config, DbTimings::default(), Duration::ZERO);
        assert!(record.is_logged());
        assert_eq!(sink.written().len(), 1);
    }

    #[test]
    fn formatter_failure_falls_back_to_minimal_record() {
        let sink = Arc::new(CaptureSink::default());
        let config = LoggerConfig::default()
            .with_sink(sink.clone())
            .with_formatter(Arc::new(BrokenFormatter));

        let mut headers = HeaderMap::new();
        headers.insert("host", "api.example.com".parse().unwrap());
        let request = Request::new(Method::GET, "/users/1".parse().unwrap(), headers);
        let parts = request.parts();
        let record = RequestRecord::new();
        let ctx = LogContext {
            request: &parts,
            route: None,
            response: None,
            error: None,
            record: &record,
        };

        log_request(&ctx, &config, DbTimings::default(), Duration::ZERO);

        // exactly one write: the fallback record, read off raw parts
        let written = sink.written();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].1["method"], "GET");
        assert_eq!(written[0].1["path"], "/users/1");
        assert_eq!(written[0].1["host"], "api.example.com");
        assert!(!record.is_logged());
    }

    #[test]
    fn attempted_failure_never_re_emits() {
        let sink = Arc::new(CaptureSink::failing());
        let config = LoggerConfig::default().with_sink(sink.clone());

        let (request, route, response, record) = scenario_context();
        let parts = request.parts();
        let ctx = LogContext {
            request: &parts,
            route: Some(&route),
            response: Some(&response),
            error: None,
            record: &record,
        };

        log_request(&ctx, &config, DbTimings::default(), Duration::ZERO);
        // the primary write was attempted once; the fallback must not retry
        assert_eq!(sink.attempts(), 1);
        assert!(sink.written().is_empty());
        assert!(!record.is_logged());
    }

    #[test]
    fn fallback_includes_failure_status() {
        let sink = Arc::new(CaptureSink::default());
        let config = LoggerConfig::default().with_sink(sink.clone());

        let request = Request::new(Method::GET, "/boom".parse().unwrap(), HeaderMap::new());
        let error = Error::not_found("boom");
        emit_fallback(&request.parts(), Some(&error), &config);

        let written = sink.written();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, "error");
        assert_eq!(written[0].1["status"], 404);
        assert_eq!(written[0].1["exception"]["class"], "NotFound");
    }
}
