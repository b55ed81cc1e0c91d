//! The client facade: one handle that owns the whole synchronization
//! core.
//!
//! `ForumClient::connect` wires the REST client, snapshot, pull
//! synchronizer, push listener, and mutation dispatcher together, runs the
//! startup pull, and spawns the listener task. `shutdown` tears it all
//! down: the push connection closes gracefully and in-flight pulls are
//! staled so they cannot write into a snapshot nothing reads anymore.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::dispatch::MutationDispatcher;
use crate::error::SyncError;
use crate::models::{Answer, AnswerId, Question, QuestionId, QuestionStatus};
use crate::notify::{self, Notification};
use crate::ordering;
use crate::push::{ConnectionState, PushListener};
use crate::rest::{ForumApi, ForumBackend};
use crate::snapshot::{SnapshotCache, SnapshotView};
use crate::sync::PullSynchronizer;

/// Live handle to a synchronized forum session.
pub struct ForumClient {
    snapshot: SnapshotCache,
    sync: Arc<PullSynchronizer>,
    dispatcher: MutationDispatcher,
    connection: watch::Receiver<ConnectionState>,
    shutdown: watch::Sender<bool>,
    listener_task: JoinHandle<()>,
}

impl ForumClient {
    /// Connect to the forum named by `config`: build the REST client, run
    /// the startup pull, and open the push channel.
    ///
    /// Also returns the transient-notification stream; dropping the
    /// receiver is allowed and merely discards notifications.
    pub async fn connect(
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<Notification>), SyncError> {
        let backend: Arc<dyn ForumBackend> = Arc::new(ForumApi::new(&config)?);
        Self::connect_with_backend(config, backend).await
    }

    /// As [`connect`](ForumClient::connect), with a caller-provided
    /// backend. The seam the integration tests use.
    pub async fn connect_with_backend(
        config: SyncConfig,
        backend: Arc<dyn ForumBackend>,
    ) -> Result<(Self, mpsc::Receiver<Notification>), SyncError> {
        let snapshot = SnapshotCache::new();
        let sync = Arc::new(PullSynchronizer::new(
            Arc::clone(&backend),
            snapshot.clone(),
        ));

        // Startup pull. A failure here is recoverable (the listener's
        // first-connect repair refresh retries it), so connect proceeds.
        if let Err(e) = sync.refresh().await {
            warn!(error = %e, "startup refresh failed; continuing with an empty snapshot");
        }

        let (notifier, notifications) = notify::channel(config.notify_buffer);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let (listener, connection) = PushListener::new(
            config.ws_url.clone(),
            snapshot.clone(),
            Arc::clone(&sync),
            notifier,
            config.reconnect_base,
            config.reconnect_max,
        );
        let listener_task = tokio::spawn(listener.run(shutdown_rx));

        let dispatcher = MutationDispatcher::new(
            backend,
            snapshot.clone(),
            Arc::clone(&sync),
            config.confirm_window,
        );

        info!(ws_url = %config.ws_url, "forum client connected");

        let client = Self {
            snapshot,
            sync,
            dispatcher,
            connection,
            shutdown,
            listener_task,
        };
        Ok((client, notifications))
    }

    /// Questions in display order: Escalated first, then newest first.
    pub fn questions(&self) -> Vec<Question> {
        ordering::display_order(self.snapshot.read().questions())
    }

    /// Cached answers for one question, in arrival order.
    pub fn answers_for(&self, question_id: QuestionId) -> Vec<Answer> {
        self.snapshot.read().answers_for(question_id).to_vec()
    }

    /// A raw point-in-time view of the snapshot.
    pub fn view(&self) -> SnapshotView {
        self.snapshot.read()
    }

    /// Current state of the push connection.
    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    /// Force a pull refresh now.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        self.sync.refresh().await
    }

    /// Post a new question.
    pub async fn submit_question(&self, message: &str) -> Result<Question, SyncError> {
        self.dispatcher.submit_question(message).await
    }

    /// Post a new answer.
    pub async fn submit_answer(
        &self,
        question_id: QuestionId,
        message: &str,
    ) -> Result<Answer, SyncError> {
        self.dispatcher.submit_answer(question_id, message).await
    }

    /// Admin: change a question's triage status.
    pub async fn change_status(
        &self,
        question_id: QuestionId,
        new_status: QuestionStatus,
    ) -> Result<(), SyncError> {
        self.dispatcher.change_status(question_id, new_status).await
    }

    /// Admin: delete an answer.
    pub async fn delete_answer(
        &self,
        question_id: QuestionId,
        answer_id: AnswerId,
    ) -> Result<(), SyncError> {
        self.dispatcher.delete_answer(question_id, answer_id).await
    }

    /// Tear the session down: close the push connection gracefully, stop
    /// the listener, and stale the synchronizer so abandoned pulls cannot
    /// mutate the snapshot.
    pub async fn shutdown(self) {
        self.sync.mark_stale();
        let _ = self.shutdown.send(true);
        if let Err(e) = self.listener_task.await {
            warn!(error = %e, "push listener task ended abnormally");
        }
        info!("forum client shut down");
    }
}
