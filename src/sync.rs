//! Pull synchronization against the REST API.
//!
//! A refresh fetches the full question list, then the answers for every
//! question concurrently, and merges the lot into the snapshot. The merge
//! never clobbers newer push-delivered data (see
//! [`SnapshotCache::replace_answers`](crate::snapshot::SnapshotCache::replace_answers)),
//! so a refresh can race the push listener freely.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::rest::ForumBackend;
use crate::snapshot::SnapshotCache;

/// Pull synchronizer. Shared through an [`Arc`] by the push listener and
/// the mutation dispatcher.
pub struct PullSynchronizer {
    backend: Arc<dyn ForumBackend>,
    snapshot: SnapshotCache,
    alive: Arc<AtomicBool>,
}

impl PullSynchronizer {
    pub fn new(backend: Arc<dyn ForumBackend>, snapshot: SnapshotCache) -> Self {
        Self {
            backend,
            snapshot,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Fetch the question list and every question's answers, then merge
    /// into the snapshot.
    ///
    /// A failed question-list fetch leaves the snapshot untouched and is
    /// returned as a recoverable error. A failed per-question answer fetch
    /// only skips that question's sequence; the rest of the refresh
    /// proceeds. Nothing is applied if the owning client shut down while
    /// the fetches were in flight.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let questions = self.backend.list_questions().await?;

        let fetches = questions.iter().map(|question| {
            let backend = Arc::clone(&self.backend);
            let id = question.id;
            async move { (id, backend.list_answers(id).await) }
        });
        let answer_batches = join_all(fetches).await;

        // A late resolution must not mutate a snapshot nothing reads anymore.
        if !self.is_alive() {
            return Err(SyncError::Stale);
        }

        let question_count = questions.len();
        for question in questions {
            self.snapshot.upsert_question(question);
        }

        let mut failed = 0usize;
        for (question_id, result) in answer_batches {
            match result {
                Ok(answers) => self.snapshot.replace_answers(question_id, answers),
                Err(e) => {
                    failed += 1;
                    warn!(
                        question_id,
                        error = %e,
                        "answers fetch failed; keeping cached answers"
                    );
                }
            }
        }

        debug!(questions = question_count, failed_answer_fetches = failed, "refresh applied");
        Ok(())
    }

    /// Mark the synchronizer stale. In-flight refreshes resolve without
    /// touching the snapshot afterwards.
    pub fn mark_stale(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}
