//! Per-request accumulator for database sub-operation timing
//!
//! State is bound to the current task through a `tokio::task_local!` scope,
//! so concurrent requests on different tasks never observe each other's
//! counters. Execution contexts are reused across requests; reset-on-entry
//! is a correctness invariant, not an optimization — [`scope`] installs a
//! zeroed accumulator and the request wrapper additionally calls [`reset`]
//! at the top of every request.
//!
//! All operations are infallible from the caller's point of view: recording
//! outside an active scope is dropped, and snapshots without a scope read
//! as zero.

use std::cell::Cell;
use std::future::Future;
use std::time::{Duration, Instant};

/// Accumulated database timing for one request.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DbTimings {
    /// Total sub-operation time in seconds
    pub duration: f64,
    /// Number of completed sub-operations
    pub count: u64,
}

tokio::task_local! {
    static ACTIVE: Cell<DbTimings>;
}

/// Run a future with a fresh accumulator bound to the current task.
///
/// Nested sub-operation events recorded while the future runs accumulate
/// into this scope and are discarded when it ends.
pub async fn scope<F: Future>(f: F) -> F::Output {
    ACTIVE.scope(Cell::new(DbTimings::default()), f).await
}

/// Zero the current context's counters.
///
/// A missing scope is absorbed; the request proceeds with default timing.
pub fn reset() {
    let _ = ACTIVE.try_with(|cell| cell.set(DbTimings::default()));
}

/// Add one completed sub-operation to the current context.
///
/// Safe to call zero, one, or many times per request; calls outside an
/// active scope are dropped.
pub fn record(elapsed: Duration) {
    let _ = ACTIVE.try_with(|cell| {
        let mut timings = cell.get();
        timings.duration += elapsed.as_secs_f64();
        timings.count += 1;
        cell.set(timings);
    });
}

/// Read the current context's counters without resetting them.
pub fn snapshot() -> DbTimings {
    ACTIVE.try_with(Cell::get).unwrap_or_default()
}

/// Time a sub-operation future and feed the result into the accumulator.
///
/// This is the seam the data layer calls once per round trip.
pub async fn observe<F: Future>(f: F) -> F::Output {
    let started = Instant::now();
    let output = f.await;
    record(started.elapsed());
    output
}

/// Synchronous counterpart of [`observe`].
pub fn observe_sync<T>(f: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let output = f();
    record(started.elapsed());
    output
}
