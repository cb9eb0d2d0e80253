//! Reaction to store connection errors.
//!
//! Two states: `Connected` and `Faulted`. Any connection error moves the
//! handler to `Faulted` and is logged. A refused connection additionally
//! forces the backend to quit. There is no retry at this layer.

use crate::backend::CacheBackend;
use crate::error::{AppError, Error};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Faulted,
}

/// What the handler did with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOutcome {
    /// Error was logged; the store may recover through its client.
    Logged,
    /// Error was fatal; the backend was told to quit.
    Terminated,
}

#[derive(Debug, Default)]
pub struct ConnectionErrorHandler {
    faulted: AtomicBool,
    errors_seen: AtomicU64,
}

impl ConnectionErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        if self.faulted.load(Ordering::Acquire) {
            ConnectionState::Faulted
        } else {
            ConnectionState::Connected
        }
    }

    /// Number of errors handled since construction.
    pub fn errors_seen(&self) -> u64 {
        self.errors_seen.load(Ordering::Relaxed)
    }

    /// Return to `Connected` after a successful (re)connect.
    pub fn mark_connected(&self) {
        self.faulted.store(false, Ordering::Release);
    }

    /// Handle one error event from `backend`.
    pub async fn handle<B: CacheBackend>(&self, error: &Error, backend: &B) -> ErrorOutcome {
        self.faulted.store(true, Ordering::Release);
        self.errors_seen.fetch_add(1, Ordering::Relaxed);

        let report = AppError::cache_connection(error);
        error!(
            "✗ {}: status={} details={}",
            report.message,
            report.status,
            report.details.as_deref().unwrap_or("{}")
        );

        if !error.is_fatal() {
            return ErrorOutcome::Logged;
        }

        if let Err(e) = backend.quit().await {
            warn!("⚠ Cache quit after fatal connection error failed: {}", e);
        }
        ErrorOutcome::Terminated
    }
}
