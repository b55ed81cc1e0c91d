//! Data types shared by the pull and push paths.
//!
//! Field names follow the forum's wire format exactly (`questionid`,
//! `answerid`, `Status`, `created_at`), so the same types decode REST
//! responses and push frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque question identifier (integer on the wire).
pub type QuestionId = i64;

/// Opaque answer identifier (integer on the wire).
pub type AnswerId = i64;

/// Triage status of a question. `Escalated` questions order ahead of all
/// others in the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionStatus {
    Pending,
    Answered,
    Escalated,
}

impl QuestionStatus {
    /// Wire value, as used by the change-status endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionStatus::Pending => "Pending",
            QuestionStatus::Answered => "Answered",
            QuestionStatus::Escalated => "Escalated",
        }
    }
}

impl std::fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A visitor-posted question.
///
/// Identity is `id`; only `status` is observed to change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "questionid")]
    pub id: QuestionId,
    pub message: String,
    #[serde(rename = "Status")]
    pub status: QuestionStatus,
    pub created_at: DateTime<Utc>,
}

/// An answer to a question. Belongs to exactly one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(rename = "answerid")]
    pub id: AnswerId,
    #[serde(rename = "questionid")]
    pub question_id: QuestionId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// One inbound frame from the push channel.
///
/// Closed tagged union with a default arm: tags this client does not know
/// decode to `Unknown` and are ignored, keeping the listener forward
/// compatible with new event types.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PushEvent {
    #[serde(rename = "new_question")]
    NewQuestion(Question),
    #[serde(rename = "new_answer")]
    NewAnswer(Answer),
    #[serde(other)]
    Unknown,
}

/// Bearer token returned by `POST /auth/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}
