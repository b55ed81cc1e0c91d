//! Deterministic display ordering for questions.
//!
//! Escalated questions come first, then everything else; each partition is
//! newest-first with ascending id breaking timestamp ties. The order is a
//! pure function of the input and is recomputed on every read, because
//! status and membership can change between reads.

use std::cmp::Ordering;

use crate::models::{Question, QuestionStatus};

/// Produce the display order over a set of questions.
pub fn display_order(mut questions: Vec<Question>) -> Vec<Question> {
    questions.sort_by(compare);
    questions
}

fn compare(a: &Question, b: &Question) -> Ordering {
    let a_escalated = a.status == QuestionStatus::Escalated;
    let b_escalated = b.status == QuestionStatus::Escalated;
    b_escalated
        .cmp(&a_escalated)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}
