//! Metadata extraction for the request log record
//!
//! Every operation here is independently failure-safe: malformed or missing
//! input yields the documented fallback value, never an error. The request
//! wrapper calls these after the downstream chain has fully returned, so
//! the values they read are post-error-handling.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::context::LogContext;
use crate::errors::resolve_status;
use crate::request::RequestParts;
use crate::routing::RouteDescriptor;

/// Sentinel action when the matched route is unknown.
pub const UNKNOWN_ACTION: &str = "unknown";

const FILTERED: &str = "[FILTERED]";
const MAX_DEPTH_MARKER: &str = "[max_depth_exceeded]";
const MAX_FILTER_DEPTH: usize = 10;
const MAX_KEYS: usize = 50;
const MAX_ITEMS: usize = 100;

/// Keys stripped from the final parameter output regardless of filtering.
const EXCLUDED_KEYS: [&str; 3] = ["controller", "action", "format"];
/// Internal routing metadata, excluded under both of its representations.
const ROUTE_INFO_KEYS: [&str; 2] = ["route_info", "_route_info"];
/// Source-tree prefix controller names are derived from.
const API_PREFIX: &str = "src/api/";

static SENSITIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new("(?i)password|secret|token|key").unwrap());
static UNDERSCORE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new("_{2,}").unwrap());

/// Externally configured parameter filter.
pub trait ParamFilter: Send + Sync {
    fn filter(&self, params: Map<String, Value>) -> Map<String, Value>;
}

/// Resolve the status the emitted record should carry.
///
/// Priority: status attached to the processing record by the in-chain error
/// handler, then the returned response's status, then the route
/// descriptor's own status slot when it is an error status (descriptors are
/// pooled, a stale success value is unreliable), then the captured failure,
/// then 200.
pub fn status(ctx: &LogContext<'_>) -> u16 {
    if let Some(status) = ctx.record.status() {
        return status;
    }
    if let Some(response) = ctx.response {
        return response.status_code().as_u16();
    }
    if let Some(status) = ctx.route.and_then(RouteDescriptor::last_status) {
        if status >= 400 {
            return status;
        }
    }
    if let Some(error) = ctx.error {
        return resolve_status(error).as_u16();
    }
    200
}

/// Derive the action name from the matched route's verb and path template.
///
/// `GET /users/:id/posts/:post_id` becomes `get_users_id_posts_post_id`.
pub fn action(route: Option<&RouteDescriptor>) -> String {
    let Some(route) = route else {
        return UNKNOWN_ACTION.to_string();
    };

    let verb = route.verb().as_str().to_lowercase();
    let template = route.path_template();
    if template.is_empty() || template == "/" {
        return verb;
    }

    let flattened: String = template
        .trim_start_matches('/')
        .chars()
        .map(|c| if c == ':' || c == '/' { '_' } else { c })
        .collect();
    let collapsed = UNDERSCORE_RUNS.replace_all(&flattened, "_");
    let cleaned = collapsed.trim_matches('_');
    if cleaned.is_empty() {
        return verb;
    }

    format!("{verb}_{cleaned}")
}

/// Derive the controller name from the route's source file.
///
/// `<app_root>/src/api/admin/reports.rs` becomes `Admin::Reports`. None
/// when the source location, the application root, or the `src/api/` prefix
/// is missing.
pub fn controller(route: Option<&RouteDescriptor>, app_root: Option<&str>) -> Option<String> {
    let source = route?.source_location()?;
    let root = app_root?;
    let relative = source.file.strip_prefix(root)?.trim_start_matches('/');
    let relative = relative.strip_prefix(API_PREFIX)?;
    let relative = relative.strip_suffix(".rs")?;

    let name = relative
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("::");
    (!name.is_empty()).then_some(name)
}

/// Format the route's source position as `path:line`, with the application
/// root stripped when the file lives under it.
pub fn source_location(route: Option<&RouteDescriptor>, app_root: Option<&str>) -> Option<String> {
    let source = route?.source_location()?;
    let path = app_root
        .and_then(|root| source.file.strip_prefix(root))
        .map(|relative| relative.trim_start_matches('/'))
        .unwrap_or(&source.file);
    Some(format!("{}:{}", path, source.line))
}

/// Negotiate the request format.
///
/// Priority: format attached to the processing record, the request's path
/// extension, the Content-Type header matched against the route's declared
/// table, the Accept header matched the same way, the route's first
/// declared format, then `json`.
pub fn format(ctx: &LogContext<'_>) -> String {
    negotiated_format(ctx)
        .unwrap_or_else(|| "json".to_string())
        .trim_start_matches('.')
        .to_lowercase()
}

fn negotiated_format(ctx: &LogContext<'_>) -> Option<String> {
    if let Some(format) = ctx.record.format() {
        return Some(format);
    }
    if let Some(format) = ctx.request.format() {
        return Some(format.to_string());
    }

    let route = ctx.route?;
    if let Some(format) = ctx
        .request
        .content_type()
        .and_then(|value| route.format_for_media_type(value))
    {
        return Some(format.to_string());
    }
    if let Some(format) = ctx
        .request
        .header_str("accept")
        .and_then(|value| accept_format(route, value))
    {
        return Some(format.to_string());
    }
    route.formats().first().cloned()
}

fn accept_format<'r>(route: &'r RouteDescriptor, accept: &str) -> Option<&'r str> {
    accept
        .split(',')
        .find_map(|entry| route.format_for_media_type(entry))
}

/// Harvest the request's already-parsed parameters.
///
/// Merges query, path, and framework-parsed body parameters; the internal
/// `route_info` key is excluded. Only when the merged map is empty does
/// this fall back to parsing the buffered body as JSON, and only for
/// JSON-family content types. Empty map on any failure.
pub fn params(request: &RequestParts) -> Map<String, Value> {
    let mut merged = Map::new();
    for (key, value) in &request.query_params {
        merged.insert(key.clone(), Value::String(value.clone()));
    }
    for (key, value) in &request.path_params {
        merged.insert(key.clone(), Value::String(value.clone()));
    }
    for (key, value) in &request.body_params {
        merged.insert(key.clone(), value.clone());
    }
    strip_route_info(&mut merged);

    if merged.is_empty() {
        if let Some(mut parsed) = parse_json_body(request) {
            strip_route_info(&mut parsed);
            merged = parsed;
        }
    }
    merged
}

fn parse_json_body(request: &RequestParts) -> Option<Map<String, Value>> {
    if !request.is_json() {
        return None;
    }
    let body = request.body.as_ref()?;
    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn strip_route_info(params: &mut Map<String, Value>) {
    for key in ROUTE_INFO_KEYS {
        params.remove(key);
    }
}

/// Sanitize harvested parameters.
///
/// Delegates to the configured [`ParamFilter`] when one exists, otherwise
/// applies the manual filter. The `controller`/`action`/`format` keys are
/// removed from the output regardless of which path ran.
pub fn filter_params(
    params: Map<String, Value>,
    filter: Option<&dyn ParamFilter>,
) -> Map<String, Value> {
    let mut filtered = match filter {
        Some(filter) => filter.filter(params),
        None => manual_filter(params),
    };
    for key in EXCLUDED_KEYS {
        filtered.remove(key);
    }
    filtered
}

fn manual_filter(params: Map<String, Value>) -> Map<String, Value> {
    match filter_value(Value::Object(params), 1) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn filter_value(value: Value, depth: usize) -> Value {
    match value {
        Value::Object(map) => {
            if depth > MAX_FILTER_DEPTH {
                return max_depth_marker();
            }
            let mut filtered = Map::new();
            for (key, value) in map.into_iter().take(MAX_KEYS) {
                if SENSITIVE.is_match(&key) {
                    filtered.insert(key, Value::String(FILTERED.to_string()));
                } else {
                    filtered.insert(key, filter_value(value, depth + 1));
                }
            }
            Value::Object(filtered)
        }
        Value::Array(items) => {
            if depth > MAX_FILTER_DEPTH {
                return max_depth_marker();
            }
            Value::Array(
                items
                    .into_iter()
                    .take(MAX_ITEMS)
                    .map(|item| filter_value(item, depth + 1))
                    .collect(),
            )
        }
        // String values are scanned too; a value that merely contains a
        // sensitive substring is redacted.
        Value::String(text) => {
            if SENSITIVE.is_match(&text) {
                Value::String(FILTERED.to_string())
            } else {
                Value::String(text)
            }
        }
        other => other,
    }
}

fn max_depth_marker() -> Value {
    let mut marker = Map::new();
    marker.insert(
        FILTERED.to_string(),
        Value::String(MAX_DEPTH_MARKER.to_string()),
    );
    Value::Object(marker)
}

/// Host serving the request, from the Host header or the URI authority.
pub fn host(request: &RequestParts) -> String {
    request
        .header_str("host")
        .map(String::from)
        .or_else(|| request.uri.host().map(String::from))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Client address, honoring forwarding proxies.
pub fn remote_addr(request: &RequestParts) -> String {
    request
        .header_str("x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| request.header_str("x-real-ip").map(String::from))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Request id forwarded by the client or an upstream proxy, when present.
pub fn request_id(request: &RequestParts) -> Option<String> {
    request
        .header_str("x-request-id")
        .map(String::from)
        .filter(|id| !id.is_empty())
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
