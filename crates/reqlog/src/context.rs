//! Per-request processing record shared along the middleware chain
//!
//! The request wrapper inserts a [`RequestRecord`] into the request's
//! extensions at the top of every request. Stages further down the chain
//! (the error handler, format negotiation) write authoritative values into
//! it; the extractors read it when the record is assembled. One record lives
//! exactly as long as one request.

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::errors::Error;
use crate::request::RequestParts;
use crate::response::Response;
use crate::routing::RouteDescriptor;

/// Shared mutable slot for one request's processing outcome.
#[derive(Debug)]
pub struct RequestRecord {
    id: Uuid,
    // 0 = unset; written by the in-chain error handler
    status: AtomicU16,
    logged: AtomicBool,
    format: Mutex<Option<String>>,
}

impl RequestRecord {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: AtomicU16::new(0),
            logged: AtomicBool::new(false),
            format: Mutex::new(None),
        }
    }

    /// Internal correlation id for diagnostics about this request's logging
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Attach the authoritative post-error-handling status
    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::Relaxed);
    }

    /// Authoritative status, when one has been attached
    pub fn status(&self) -> Option<u16> {
        match self.status.load(Ordering::Relaxed) {
            0 => None,
            status => Some(status),
        }
    }

    /// Mark that the primary log path emitted successfully
    pub fn mark_logged(&self) {
        self.logged.store(true, Ordering::Relaxed);
    }

    /// Whether a record for this request has already been emitted
    pub fn is_logged(&self) -> bool {
        self.logged.load(Ordering::Relaxed)
    }

    /// Attach the negotiated format for this request
    pub fn set_format<T: Into<String>>(&self, format: T) {
        if let Ok(mut slot) = self.format.lock() {
            *slot = Some(format.into());
        }
    }

    /// Negotiated format, when one has been attached
    pub fn format(&self) -> Option<String> {
        self.format.lock().ok().and_then(|slot| slot.clone())
    }
}

impl Default for RequestRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the extractors see for one request, borrowed for the duration
/// of record assembly.
pub struct LogContext<'a> {
    pub request: &'a RequestParts,
    pub route: Option<&'a RouteDescriptor>,
    pub response: Option<&'a Response>,
    pub error: Option<&'a Error>,
    pub record: &'a RequestRecord,
}

/// Route descriptor attachment, as stored in request extensions.
pub type SharedRoute = Arc<RouteDescriptor>;

/// Request record attachment, as stored in request extensions.
pub type SharedRecord = Arc<RequestRecord>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_slot_starts_unset() {
        let record = RequestRecord::new();
        assert_eq!(record.status(), None);

        record.set_status(422);
        assert_eq!(record.status(), Some(422));
    }

    #[test]
    fn logged_flag_latches() {
        let record = RequestRecord::new();
        assert!(!record.is_logged());
        record.mark_logged();
        assert!(record.is_logged());
    }

    #[test]
    fn format_override_round_trips() {
        let record = RequestRecord::new();
        assert_eq!(record.format(), None);
        record.set_format("xml");
        assert_eq!(record.format(), Some("xml".to_string()));
    }
}
