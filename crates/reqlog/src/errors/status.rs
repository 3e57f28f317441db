//! Failure-to-status resolution
//!
//! Maps a raised failure to the HTTP status the emitted log record should
//! carry. Layered lookup, first match wins: explicit status override, then
//! an integer `status` entry in the failure's options map, then the static
//! variant table, then 500. A value that is not a valid HTTP status integer
//! at any stage is treated as a miss and the search continues.

use axum::http::StatusCode;

use super::http_error::Error;

/// Resolve the HTTP status for a raised failure.
pub fn resolve_status(error: &Error) -> StatusCode {
    if let Some(status) = error.status_override().and_then(valid_status) {
        return status;
    }

    if let Some(status) = options_status(error) {
        return status;
    }

    table_status(error).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn options_status(error: &Error) -> Option<StatusCode> {
    let value = error.options()?.get("status")?;
    value
        .as_u64()
        .and_then(|n| u16::try_from(n).ok())
        .and_then(valid_status)
}

fn valid_status(code: u16) -> Option<StatusCode> {
    StatusCode::from_u16(code).ok()
}

/// Static failure-type to status table.
fn table_status(error: &Error) -> Option<StatusCode> {
    match error {
        Error::NotFound { .. } => Some(StatusCode::NOT_FOUND),
        Error::Conflict { .. } => Some(StatusCode::CONFLICT),
        Error::Validation { .. } => Some(StatusCode::UNPROCESSABLE_ENTITY),
        Error::RouteNotFound { .. } => Some(StatusCode::NOT_FOUND),
        Error::MethodNotAllowed { .. } => Some(StatusCode::METHOD_NOT_ALLOWED),
        Error::NotImplemented { .. } => Some(StatusCode::NOT_IMPLEMENTED),
        Error::NotAcceptable { .. } => Some(StatusCode::NOT_ACCEPTABLE),
        Error::BadRequest { .. } => Some(StatusCode::BAD_REQUEST),
        Error::MissingParameter { .. } => Some(StatusCode::BAD_REQUEST),
        Error::Internal { .. } | Error::Other { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn explicit_override_wins() {
        let err = Error::with_status("forbidden", 403);
        assert_eq!(resolve_status(&err), StatusCode::FORBIDDEN);
    }

    #[test]
    fn invalid_override_falls_through() {
        // 99 is below the valid HTTP status range
        let err = Error::with_status("odd", 99);
        assert_eq!(resolve_status(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn options_map_status_entry() {
        let mut options = HashMap::new();
        options.insert("status".to_string(), json!(422));
        let err = Error::with_options("invalid", options);
        assert_eq!(resolve_status(&err), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn non_integer_options_status_is_a_miss() {
        let mut options = HashMap::new();
        options.insert("status".to_string(), json!("teapot"));
        let err = Error::with_options("invalid", options);
        assert_eq!(resolve_status(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn variant_table() {
        assert_eq!(resolve_status(&Error::not_found("x")), StatusCode::NOT_FOUND);
        assert_eq!(resolve_status(&Error::conflict("x")), StatusCode::CONFLICT);
        assert_eq!(
            resolve_status(&Error::validation("x")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            resolve_status(&Error::route_not_found("/x")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            resolve_status(&Error::method_not_allowed("TRACE")),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            resolve_status(&Error::not_implemented("x")),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            resolve_status(&Error::not_acceptable("x")),
            StatusCode::NOT_ACCEPTABLE
        );
        assert_eq!(
            resolve_status(&Error::bad_request("x")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            resolve_status(&Error::missing_parameter("id")),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn unmapped_failures_default_to_500() {
        assert_eq!(
            resolve_status(&Error::internal("boom")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            resolve_status(&Error::other("boom")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
