//! The client-local snapshot of forum state.
//!
//! One in-memory structure holds the last-known questions and the answers
//! for each question. Both the pull synchronizer and the push listener
//! write into it; consumers render from point-in-time views of it.
//!
//! Every operation is idempotent under duplicate application, and pull
//! and push writes commute: applying a pull merge before or after a push
//! event for the same data converges to the same snapshot. That property
//! is what lets the two sources run without coordinating.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::models::{Answer, AnswerId, Question, QuestionId};

/// Shared handle to the snapshot.
///
/// Cloning is cheap (Arc). Lock scopes are short and never held across an
/// await point.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCache {
    inner: Arc<RwLock<Snapshot>>,
}

/// The raw snapshot state.
#[derive(Debug, Clone, Default, PartialEq)]
struct Snapshot {
    questions: HashMap<QuestionId, Question>,
    answers: HashMap<QuestionId, Vec<Answer>>,
}

/// Immutable point-in-time view of the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotView {
    questions: HashMap<QuestionId, Question>,
    answers: HashMap<QuestionId, Vec<Answer>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a question by id.
    ///
    /// Replaying the same payload is a no-op in effect.
    pub fn upsert_question(&self, question: Question) {
        let mut state = self.inner.write().expect("snapshot lock poisoned");
        state.questions.insert(question.id, question);
    }

    /// Append an answer to its question's sequence.
    ///
    /// The sequence is created if the question is not yet known; a push
    /// event may outrun the pull that introduces its question, and that
    /// transient orphan heals on the next question upsert. Returns false
    /// without modifying anything when the answer id is already present,
    /// which absorbs the double delivery of a submitter's own echo.
    pub fn append_answer(&self, answer: Answer) -> bool {
        let mut state = self.inner.write().expect("snapshot lock poisoned");
        let sequence = state.answers.entry(answer.question_id).or_default();
        if sequence.iter().any(|a| a.id == answer.id) {
            return false;
        }
        sequence.push(answer);
        true
    }

    /// Remove an answer by id. No-op if the answer is not present.
    pub fn remove_answer(&self, question_id: QuestionId, answer_id: AnswerId) -> bool {
        let mut state = self.inner.write().expect("snapshot lock poisoned");
        match state.answers.get_mut(&question_id) {
            Some(sequence) => {
                let before = sequence.len();
                sequence.retain(|a| a.id != answer_id);
                sequence.len() != before
            }
            None => false,
        }
    }

    /// Delete a question and its answer sequence.
    pub fn remove_question(&self, question_id: QuestionId) -> bool {
        let mut state = self.inner.write().expect("snapshot lock poisoned");
        state.answers.remove(&question_id);
        state.questions.remove(&question_id).is_some()
    }

    /// Merge a freshly pulled answer sequence for one question.
    ///
    /// The fetched sequence is authoritative for every id it contains.
    /// Cached answers whose ids are absent from it are preserved (after
    /// the fetched ones, in cached order): the pull may have raced a push,
    /// and dropping the pushed entry would un-deliver a live event.
    pub fn replace_answers(&self, question_id: QuestionId, fetched: Vec<Answer>) {
        let mut state = self.inner.write().expect("snapshot lock poisoned");
        let fetched_ids: HashSet<AnswerId> = fetched.iter().map(|a| a.id).collect();
        let mut merged = fetched;
        if let Some(existing) = state.answers.get(&question_id) {
            for answer in existing {
                if !fetched_ids.contains(&answer.id) {
                    merged.push(answer.clone());
                }
            }
        }
        state.answers.insert(question_id, merged);
    }

    /// Immutable point-in-time view.
    pub fn read(&self) -> SnapshotView {
        let state = self.inner.read().expect("snapshot lock poisoned");
        SnapshotView {
            questions: state.questions.clone(),
            answers: state.answers.clone(),
        }
    }
}

impl SnapshotView {
    /// All known questions, unordered. Use
    /// [`ordering::display_order`](crate::ordering::display_order) for the
    /// render order.
    pub fn questions(&self) -> Vec<Question> {
        self.questions.values().cloned().collect()
    }

    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.get(&id)
    }

    /// Cached answers for a question, in arrival order.
    pub fn answers_for(&self, question_id: QuestionId) -> &[Answer] {
        self.answers
            .get(&question_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains_answer(&self, question_id: QuestionId, answer_id: AnswerId) -> bool {
        self.answers_for(question_id).iter().any(|a| a.id == answer_id)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}
