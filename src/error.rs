//! Error handling for the forum synchronization core.
//!
//! This module provides idiomatic Rust error types using thiserror for
//! better error messages and proper error chain handling. Nothing here is
//! fatal to the process: every variant is recoverable, and the worst
//! outcome of any failure is a stale snapshot that the next refresh
//! repairs.

use thiserror::Error;

/// Main error type for the synchronization core
#[derive(Error, Debug)]
pub enum SyncError {
    /// Transport-level failure talking to the REST API (connection refused,
    /// timeout, TLS). Recoverable; retry is left to the caller.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Failure on the push connection. The listener handles these itself
    /// by reconnecting with backoff.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Malformed JSON in a REST response body.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Non-2xx response from the REST API. Surfaced to the user with no
    /// state mutation and no automatic retry (creates are not idempotent
    /// server-side).
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// The owning client shut down while this operation was in flight;
    /// its result was discarded without touching the snapshot.
    #[error("client is shut down")]
    Stale,

    /// The configured base or websocket URL could not be parsed.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl SyncError {
    /// Whether retrying the same operation later can reasonably succeed.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SyncError::Stale | SyncError::InvalidUrl { .. })
    }
}
