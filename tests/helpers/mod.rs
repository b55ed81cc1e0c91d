//! Shared test fixtures: an in-memory forum backend with call counters.
#![allow(dead_code)] // each test binary uses a subset of the fixtures

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use forum_sync::{
    Answer, AnswerId, ForumBackend, Question, QuestionId, QuestionStatus, SyncError,
};

pub fn question(id: QuestionId, status: QuestionStatus, minute: u32) -> Question {
    Question {
        id,
        message: format!("question {id}"),
        status,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, minute, 0).unwrap(),
    }
}

pub fn answer(id: AnswerId, question_id: QuestionId) -> Answer {
    Answer {
        id,
        question_id,
        message: format!("answer {id}"),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
    }
}

/// In-memory [`ForumBackend`]. Reads serve the stored fixture data;
/// writes allocate ids but do not change the fixtures (mirroring a
/// service whose effects arrive via push or a later pull).
pub struct FakeForum {
    questions: Mutex<Vec<Question>>,
    answers: Mutex<HashMap<QuestionId, Vec<Answer>>>,
    next_id: AtomicUsize,
    pub list_question_calls: AtomicUsize,
    pub list_answer_calls: AtomicUsize,
}

impl FakeForum {
    pub fn new(questions: Vec<Question>, answers: HashMap<QuestionId, Vec<Answer>>) -> Self {
        Self {
            questions: Mutex::new(questions),
            answers: Mutex::new(answers),
            next_id: AtomicUsize::new(1000),
            list_question_calls: AtomicUsize::new(0),
            list_answer_calls: AtomicUsize::new(0),
        }
    }

    pub fn pulls(&self) -> usize {
        self.list_question_calls.load(Ordering::SeqCst)
    }

    pub fn set_questions(&self, questions: Vec<Question>) {
        *self.questions.lock().unwrap() = questions;
    }

    pub fn set_answers(&self, question_id: QuestionId, answers: Vec<Answer>) {
        self.answers.lock().unwrap().insert(question_id, answers);
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) as i64
    }
}

#[async_trait]
impl ForumBackend for FakeForum {
    async fn list_questions(&self) -> Result<Vec<Question>, SyncError> {
        self.list_question_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.questions.lock().unwrap().clone())
    }

    async fn list_answers(&self, question_id: QuestionId) -> Result<Vec<Answer>, SyncError> {
        self.list_answer_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .answers
            .lock()
            .unwrap()
            .get(&question_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_question(&self, message: &str) -> Result<Question, SyncError> {
        let mut created = question(self.allocate_id(), QuestionStatus::Pending, 0);
        created.message = message.to_string();
        Ok(created)
    }

    async fn create_answer(
        &self,
        question_id: QuestionId,
        message: &str,
    ) -> Result<Answer, SyncError> {
        let mut created = answer(self.allocate_id(), question_id);
        created.message = message.to_string();
        Ok(created)
    }

    async fn change_status(
        &self,
        _question_id: QuestionId,
        _new_status: QuestionStatus,
    ) -> Result<(), SyncError> {
        Ok(())
    }

    async fn delete_answer(&self, _answer_id: AnswerId) -> Result<(), SyncError> {
        Ok(())
    }
}
