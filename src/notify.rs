//! Non-blocking transient notifications.
//!
//! The push listener surfaces each applied event through a bounded channel.
//! `notify()` must never block and never fail: if the consumer falls
//! behind, the notification is dropped and counted. A missed toast is not
//! worth stalling the listener; the snapshot itself is already updated.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::models::{Answer, Question};

/// A transient, user-facing notification of a push event.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    NewQuestion(Question),
    NewAnswer(Answer),
}

/// Sending half of the notification channel.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: mpsc::Sender<Notification>,
    dropped: Arc<AtomicU64>,
}

/// Create a notification channel with the given capacity.
pub fn channel(capacity: usize) -> (Notifier, mpsc::Receiver<Notification>) {
    let (sender, receiver) = mpsc::channel(capacity);
    let notifier = Notifier {
        sender,
        dropped: Arc::new(AtomicU64::new(0)),
    };
    (notifier, receiver)
}

impl Notifier {
    /// Surface a notification. Never blocks; drops on a full buffer or a
    /// gone receiver.
    pub fn notify(&self, notification: Notification) {
        if let Err(e) = self.sender.try_send(notification) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(error = %e, "notification dropped");
        }
    }

    /// Total notifications dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
