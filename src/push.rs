//! Push listener: the realtime half of synchronization.
//!
//! One WebSocket connection per client, owned by the listener task with
//! an explicit lifecycle rather than a global socket reference. The
//! connection moves through `Disconnected -> Connecting -> Connected` and
//! back, with jittered exponential backoff between attempts.
//!
//! Delivery is at most once per connection and nothing is queued
//! server-side across disconnects, so every entry into `Connected` runs
//! one pull refresh before inbound events are trusted; the refresh closes
//! whatever gap the disconnect opened.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use rand::Rng;
use tokio::sync::watch;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::models::PushEvent;
use crate::notify::{Notification, Notifier};
use crate::snapshot::SnapshotCache;
use crate::sync::PullSynchronizer;

/// Connection lifecycle of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Jittered exponential backoff between reconnect attempts.
///
/// Doubles from `base` up to `max`, resets on a successful connect. The
/// jitter (up to 25% of the current delay) keeps a fleet of clients from
/// reconnecting in lockstep after a server restart.
#[derive(Debug)]
struct Backoff {
    base: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    fn new(base: Duration, max: Duration) -> Self {
        Self { base, max, next: base }
    }

    fn next_delay(&mut self) -> Duration {
        let current = self.next;
        let jitter_ceiling = (current.as_millis() as u64 / 4).max(1);
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ceiling));
        self.next = (current * 2).min(self.max);
        current + jitter
    }

    fn reset(&mut self) {
        self.next = self.base;
    }
}

/// Listener for the forum's push channel.
pub struct PushListener {
    ws_url: String,
    snapshot: SnapshotCache,
    sync: Arc<PullSynchronizer>,
    notifier: Notifier,
    backoff: Backoff,
    state: watch::Sender<ConnectionState>,
}

impl PushListener {
    /// Create a listener. Returns the listener and a receiver that tracks
    /// its connection state. No connection is made until [`run`] is
    /// spawned.
    ///
    /// [`run`]: PushListener::run
    pub fn new(
        ws_url: impl Into<String>,
        snapshot: SnapshotCache,
        sync: Arc<PullSynchronizer>,
        notifier: Notifier,
        reconnect_base: Duration,
        reconnect_max: Duration,
    ) -> (Self, watch::Receiver<ConnectionState>) {
        let (state, state_rx) = watch::channel(ConnectionState::Disconnected);
        let listener = Self {
            ws_url: ws_url.into(),
            snapshot,
            sync,
            notifier,
            backoff: Backoff::new(reconnect_base, reconnect_max),
            state,
        };
        (listener, state_rx)
    }

    /// Connect-and-listen loop. Runs until the shutdown channel flips to
    /// true (or is dropped), reconnecting with backoff on every failure.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(url = %self.ws_url, "push listener started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.connect_and_listen(&mut shutdown).await {
                Ok(()) => break, // graceful shutdown
                Err(e) => {
                    self.set_state(ConnectionState::Disconnected);
                    let delay = self.backoff.next_delay();
                    warn!(
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "push connection lost; reconnecting"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                break;
                            }
                        }
                    }
                }
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!("push listener stopped");
    }

    /// One connection's lifetime. Returns Ok only for a graceful
    /// shutdown; any connection loss comes back as an error so the outer
    /// loop can back off and retry.
    async fn connect_and_listen(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), SyncError> {
        self.set_state(ConnectionState::Connecting);
        let (ws, _response) = connect_async(self.ws_url.as_str()).await?;
        self.set_state(ConnectionState::Connected);
        self.backoff.reset();
        info!("push channel connected");

        // A disconnect gap is real data loss that only a pull can repair.
        // Failure here is non-fatal: events still apply, and the snapshot
        // catches up on the next repair or mutation fallback.
        if let Err(e) = self.sync.refresh().await {
            warn!(error = %e, "post-connect refresh failed; snapshot may lag");
        }

        let (mut write, mut read) = ws.split();
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(());
                    }
                }
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_frame(&text),
                    Some(Ok(Message::Ping(payload))) => {
                        write.send(Message::Pong(payload)).await?;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(SyncError::WebSocket(tungstenite::Error::ConnectionClosed));
                    }
                    Some(Ok(_)) => {} // binary/pong frames are not part of the protocol
                    Some(Err(e)) => return Err(e.into()),
                }
            }
        }
    }

    /// Decode one inbound frame and apply it to the snapshot.
    ///
    /// Malformed frames are dropped with a warning; unknown event types
    /// are ignored. Neither ever takes the listener down.
    fn handle_frame(&self, text: &str) {
        match serde_json::from_str::<PushEvent>(text) {
            Ok(PushEvent::NewQuestion(question)) => {
                debug!(question_id = question.id, "push: new question");
                self.snapshot.upsert_question(question.clone());
                self.notifier.notify(Notification::NewQuestion(question));
            }
            Ok(PushEvent::NewAnswer(answer)) => {
                // append_answer is id-deduplicated: the submitter's own
                // broadcast echo lands here after its REST response, and
                // must not produce a second entry.
                debug!(answer_id = answer.id, question_id = answer.question_id, "push: new answer");
                if self.snapshot.append_answer(answer.clone()) {
                    self.notifier.notify(Notification::NewAnswer(answer));
                }
            }
            Ok(PushEvent::Unknown) => {
                debug!("ignoring unknown push event type");
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed push frame");
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        // Receivers may all be gone during teardown; that is fine.
        let _ = self.state.send(state);
    }
}
