//! Configuration for the synchronization core.
//!
//! One struct collects everything tunable: endpoints, the REST request
//! timeout, the mutation confirmation window, and the push reconnect
//! backoff. Defaults are chosen so `SyncConfig::new(base_url)` works
//! against a locally running forum.

use std::time::Duration;

use url::Url;

use crate::error::SyncError;

/// Environment variable naming the REST base URL.
pub const ENV_API_URL: &str = "FORUM_API_URL";
/// Environment variable naming the push endpoint; derived from the base
/// URL when unset.
pub const ENV_WS_URL: &str = "FORUM_WS_URL";

/// Configuration for a [`ForumClient`](crate::client::ForumClient).
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// REST API base URL, e.g. `http://localhost:8000`.
    pub base_url: Url,

    /// Push endpoint, e.g. `ws://localhost:8000/ws`.
    pub ws_url: String,

    /// Per-request timeout on REST calls. Fetches must fail into the
    /// recoverable path, never hang against the UI.
    pub request_timeout: Duration,

    /// How long the mutation dispatcher waits for a push echo before
    /// falling back to a pull.
    pub confirm_window: Duration,

    /// First reconnect delay after the push connection drops.
    pub reconnect_base: Duration,

    /// Ceiling for the exponential reconnect backoff.
    pub reconnect_max: Duration,

    /// Capacity of the transient-notification channel.
    pub notify_buffer: usize,

    /// Bearer token attached to admin endpoints, when present.
    pub bearer_token: Option<String>,
}

impl SyncConfig {
    /// Build a configuration for the given REST base URL, deriving the
    /// push endpoint from it (`http` becomes `ws`, path `/ws`).
    pub fn new(base_url: &str) -> Result<Self, SyncError> {
        let base_url = parse_url(base_url)?;
        let ws_url = derive_ws_url(&base_url)?;
        Ok(Self {
            base_url,
            ws_url,
            request_timeout: Duration::from_secs(10),
            confirm_window: Duration::from_secs(3),
            reconnect_base: Duration::from_millis(500),
            reconnect_max: Duration::from_secs(30),
            notify_buffer: 256,
            bearer_token: None,
        })
    }

    /// Read configuration from `FORUM_API_URL` / `FORUM_WS_URL`.
    pub fn from_env() -> Result<Self, SyncError> {
        let base = std::env::var(ENV_API_URL).map_err(|_| SyncError::InvalidUrl {
            url: String::new(),
            reason: format!("{ENV_API_URL} is not set"),
        })?;
        let mut config = Self::new(&base)?;
        if let Ok(ws) = std::env::var(ENV_WS_URL) {
            config.ws_url = ws;
        }
        Ok(config)
    }

    /// Override the push endpoint.
    pub fn ws_url(mut self, ws_url: impl Into<String>) -> Self {
        self.ws_url = ws_url.into();
        self
    }

    /// Override the confirmation window.
    pub fn confirm_window(mut self, window: Duration) -> Self {
        self.confirm_window = window;
        self
    }

    /// Override the reconnect backoff bounds.
    pub fn reconnect_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.reconnect_base = base;
        self.reconnect_max = max;
        self
    }

    /// Attach a bearer token for the admin endpoints.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

fn parse_url(raw: &str) -> Result<Url, SyncError> {
    Url::parse(raw).map_err(|e| SyncError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

fn derive_ws_url(base: &Url) -> Result<String, SyncError> {
    let mut ws = base.clone();
    let scheme = match base.scheme() {
        "https" => "wss",
        _ => "ws",
    };
    ws.set_scheme(scheme).map_err(|_| SyncError::InvalidUrl {
        url: base.to_string(),
        reason: "cannot derive websocket scheme".to_string(),
    })?;
    ws.set_path("/ws");
    Ok(ws.to_string())
}
