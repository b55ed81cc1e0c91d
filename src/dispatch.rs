//! Mutation dispatch: local writes, remote confirmation.
//!
//! The dispatcher submits creates, status changes, and deletes to the
//! REST API but never mutates the snapshot itself: the push listener's
//! echo (or an interleaved pull) is the single application path, which is
//! what keeps a submission from appearing twice. After a successful write
//! it arms a confirmation timer; if the mutation's effect is not visible
//! in the snapshot when the window closes, it falls back to exactly one
//! pull refresh.
//!
//! Failed writes change nothing and are surfaced for user-driven retry.
//! There is no automatic retry: the service does not guarantee idempotency
//! of a replayed create.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::SyncError;
use crate::models::{Answer, AnswerId, Question, QuestionId, QuestionStatus};
use crate::rest::ForumBackend;
use crate::snapshot::{SnapshotCache, SnapshotView};
use crate::sync::PullSynchronizer;

/// What a confirmation timer looks for in the snapshot when its window
/// closes. If the predicate already holds, the push echo (or a pull)
/// landed and no fallback is needed.
#[derive(Debug, Clone)]
enum Confirmation {
    QuestionVisible(QuestionId),
    AnswerVisible {
        question_id: QuestionId,
        answer_id: AnswerId,
    },
    StatusApplied {
        question_id: QuestionId,
        status: QuestionStatus,
    },
    AnswerGone {
        question_id: QuestionId,
        answer_id: AnswerId,
    },
}

impl Confirmation {
    fn satisfied(&self, view: &SnapshotView) -> bool {
        match self {
            Confirmation::QuestionVisible(id) => view.question(*id).is_some(),
            Confirmation::AnswerVisible {
                question_id,
                answer_id,
            } => view.contains_answer(*question_id, *answer_id),
            Confirmation::StatusApplied {
                question_id,
                status,
            } => view
                .question(*question_id)
                .is_some_and(|q| q.status == *status),
            Confirmation::AnswerGone {
                question_id,
                answer_id,
            } => !view.contains_answer(*question_id, *answer_id),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Confirmation::QuestionVisible(_) => "question create",
            Confirmation::AnswerVisible { .. } => "answer create",
            Confirmation::StatusApplied { .. } => "status change",
            Confirmation::AnswerGone { .. } => "answer delete",
        }
    }
}

/// Submits mutations and arms their confirmation fallbacks.
pub struct MutationDispatcher {
    backend: Arc<dyn ForumBackend>,
    snapshot: SnapshotCache,
    sync: Arc<PullSynchronizer>,
    confirm_window: Duration,
}

impl MutationDispatcher {
    pub fn new(
        backend: Arc<dyn ForumBackend>,
        snapshot: SnapshotCache,
        sync: Arc<PullSynchronizer>,
        confirm_window: Duration,
    ) -> Self {
        Self {
            backend,
            snapshot,
            sync,
            confirm_window,
        }
    }

    /// Post a new question. The created question is returned to the
    /// caller but enters the snapshot only via its push echo or a pull.
    pub async fn submit_question(&self, message: &str) -> Result<Question, SyncError> {
        let created = self.backend.create_question(message).await?;
        self.arm_fallback(Confirmation::QuestionVisible(created.id));
        Ok(created)
    }

    /// Post a new answer to a question.
    pub async fn submit_answer(
        &self,
        question_id: QuestionId,
        message: &str,
    ) -> Result<Answer, SyncError> {
        let created = self.backend.create_answer(question_id, message).await?;
        self.arm_fallback(Confirmation::AnswerVisible {
            question_id,
            answer_id: created.id,
        });
        Ok(created)
    }

    /// Admin: change a question's triage status. The push protocol has no
    /// echo for this, so the armed fallback effectively schedules one
    /// repair pull.
    pub async fn change_status(
        &self,
        question_id: QuestionId,
        new_status: QuestionStatus,
    ) -> Result<(), SyncError> {
        self.backend.change_status(question_id, new_status).await?;
        self.arm_fallback(Confirmation::StatusApplied {
            question_id,
            status: new_status,
        });
        Ok(())
    }

    /// Admin: delete an answer.
    pub async fn delete_answer(
        &self,
        question_id: QuestionId,
        answer_id: AnswerId,
    ) -> Result<(), SyncError> {
        self.backend.delete_answer(answer_id).await?;
        self.arm_fallback(Confirmation::AnswerGone {
            question_id,
            answer_id,
        });
        Ok(())
    }

    /// Spawn the confirmation timer for one accepted mutation: wait the
    /// window, then pull once if the effect has not shown up.
    fn arm_fallback(&self, confirmation: Confirmation) {
        let snapshot = self.snapshot.clone();
        let sync = Arc::clone(&self.sync);
        let window = self.confirm_window;

        tokio::spawn(async move {
            tokio::time::sleep(window).await;

            if confirmation.satisfied(&snapshot.read()) {
                debug!(kind = confirmation.describe(), "mutation confirmed by echo");
                return;
            }

            debug!(
                kind = confirmation.describe(),
                window_ms = window.as_millis() as u64,
                "no echo within window; falling back to pull"
            );
            if let Err(e) = sync.refresh().await {
                warn!(error = %e, "fallback refresh failed; snapshot stays stale until next repair");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionStatus;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn question(id: QuestionId) -> Question {
        Question {
            id,
            message: format!("question {id}"),
            status: QuestionStatus::Pending,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn answer(id: AnswerId, question_id: QuestionId) -> Answer {
        Answer {
            id,
            question_id,
            message: format!("answer {id}"),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 5, 0).unwrap(),
        }
    }

    /// Backend that accepts every mutation and counts pulls.
    struct CountingBackend {
        list_question_calls: AtomicUsize,
    }

    impl CountingBackend {
        fn new() -> Self {
            Self {
                list_question_calls: AtomicUsize::new(0),
            }
        }

        fn pulls(&self) -> usize {
            self.list_question_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ForumBackend for CountingBackend {
        async fn list_questions(&self) -> Result<Vec<Question>, SyncError> {
            self.list_question_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
        async fn list_answers(&self, _q: QuestionId) -> Result<Vec<Answer>, SyncError> {
            Ok(Vec::new())
        }
        async fn create_question(&self, message: &str) -> Result<Question, SyncError> {
            let mut q = question(1);
            q.message = message.to_string();
            Ok(q)
        }
        async fn create_answer(
            &self,
            question_id: QuestionId,
            message: &str,
        ) -> Result<Answer, SyncError> {
            let mut a = answer(10, question_id);
            a.message = message.to_string();
            Ok(a)
        }
        async fn change_status(
            &self,
            _q: QuestionId,
            _s: QuestionStatus,
        ) -> Result<(), SyncError> {
            Ok(())
        }
        async fn delete_answer(&self, _a: AnswerId) -> Result<(), SyncError> {
            Ok(())
        }
    }

    /// Backend that rejects every mutation.
    struct RejectingBackend;

    #[async_trait]
    impl ForumBackend for RejectingBackend {
        async fn list_questions(&self) -> Result<Vec<Question>, SyncError> {
            Ok(Vec::new())
        }
        async fn list_answers(&self, _q: QuestionId) -> Result<Vec<Answer>, SyncError> {
            Ok(Vec::new())
        }
        async fn create_question(&self, _m: &str) -> Result<Question, SyncError> {
            Err(SyncError::Api {
                status: 422,
                body: "empty message".to_string(),
            })
        }
        async fn create_answer(&self, _q: QuestionId, _m: &str) -> Result<Answer, SyncError> {
            Err(SyncError::Api {
                status: 422,
                body: "empty answer".to_string(),
            })
        }
        async fn change_status(
            &self,
            _q: QuestionId,
            _s: QuestionStatus,
        ) -> Result<(), SyncError> {
            Err(SyncError::Api {
                status: 401,
                body: "not authorized".to_string(),
            })
        }
        async fn delete_answer(&self, _a: AnswerId) -> Result<(), SyncError> {
            Err(SyncError::Api {
                status: 401,
                body: "not authorized".to_string(),
            })
        }
    }

    fn dispatcher(
        backend: Arc<CountingBackend>,
        snapshot: SnapshotCache,
    ) -> MutationDispatcher {
        let sync = Arc::new(PullSynchronizer::new(backend.clone(), snapshot.clone()));
        MutationDispatcher::new(backend, snapshot, sync, Duration::from_secs(3))
    }

    #[tokio::test(start_paused = true)]
    async fn unconfirmed_submission_triggers_exactly_one_refresh() {
        let backend = Arc::new(CountingBackend::new());
        let snapshot = SnapshotCache::new();
        let dispatcher = dispatcher(backend.clone(), snapshot);

        let created = dispatcher.submit_answer(1, "hello").await.unwrap();
        assert_eq!(created.question_id, 1);
        assert_eq!(backend.pulls(), 0);

        // No echo arrives. Crossing the window must pull exactly once.
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(backend.pulls(), 1);

        // And never again.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.pulls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn echoed_submission_skips_the_fallback() {
        let backend = Arc::new(CountingBackend::new());
        let snapshot = SnapshotCache::new();
        let dispatcher = dispatcher(backend.clone(), snapshot.clone());

        let created = dispatcher.submit_answer(1, "hello").await.unwrap();

        // The push echo lands inside the window.
        snapshot.append_answer(created);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(backend.pulls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn submission_does_not_mutate_the_snapshot() {
        let backend = Arc::new(CountingBackend::new());
        let snapshot = SnapshotCache::new();
        let dispatcher = dispatcher(backend.clone(), snapshot.clone());

        dispatcher.submit_question("anyone?").await.unwrap();
        assert_eq!(snapshot.read().question_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn status_change_without_echo_falls_back_to_pull() {
        let backend = Arc::new(CountingBackend::new());
        let snapshot = SnapshotCache::new();
        snapshot.upsert_question(question(1));
        let dispatcher = dispatcher(backend.clone(), snapshot);

        dispatcher
            .change_status(1, QuestionStatus::Escalated)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(backend.pulls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_mutation_changes_nothing_and_schedules_nothing() {
        let backend = Arc::new(RejectingBackend);
        let snapshot = SnapshotCache::new();
        let sync = Arc::new(PullSynchronizer::new(backend.clone(), snapshot.clone()));
        let dispatcher = MutationDispatcher::new(
            backend,
            snapshot.clone(),
            sync,
            Duration::from_secs(3),
        );

        let err = dispatcher.submit_question("").await.unwrap_err();
        assert!(matches!(err, SyncError::Api { status: 422, .. }));
        assert_eq!(snapshot.read().question_count(), 0);

        // No fallback timer was armed for the failed write.
        tokio::time::sleep(Duration::from_secs(10)).await;
    }
}
