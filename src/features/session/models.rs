use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    common::{
        codec::{CodecError, decode_id_order},
        error::SessionRejection,
        validation::{validate_section, validate_student_name},
    },
    features::quiz::models::PublicQuestion,
};

/// Row shape of `quiz_sessions`; `question_order` is still encoded.
#[derive(Debug, sqlx::FromRow)]
pub struct QuizSessionRow {
    pub id: i64,
    pub session_token: String,
    pub student_id: i64,
    pub quiz_id: i64,
    pub question_order: String,
    pub current_index: i64,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    pub id: i64,
    pub session_token: String,
    pub student_id: i64,
    pub quiz_id: i64,
    pub question_order: Vec<i64>,
    pub current_index: usize,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<QuizSessionRow> for QuizSession {
    type Error = CodecError;

    fn try_from(row: QuizSessionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            session_token: row.session_token,
            student_id: row.student_id,
            quiz_id: row.quiz_id,
            question_order: decode_id_order("quiz_sessions.question_order", &row.question_order)?,
            current_index: row.current_index.max(0) as usize,
            started_at: row.started_at,
            expires_at: row.expires_at,
            completed_at: row.completed_at,
        })
    }
}

impl QuizSession {
    pub fn total_questions(&self) -> usize {
        self.question_order.len()
    }

    pub fn current_question_id(&self) -> Option<i64> {
        self.question_order.get(self.current_index).copied()
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.question_order.len()
    }
}

/// Lifecycle of a session. `Completed` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active { current_index: usize },
    Completed { completed_at: DateTime<Utc> },
    Expired { expired_at: DateTime<Utc> },
}

impl SessionStatus {
    /// The one place session validity is derived. Completion wins over expiry.
    pub fn of(session: &QuizSession, now: DateTime<Utc>) -> Self {
        if let Some(completed_at) = session.completed_at {
            return SessionStatus::Completed { completed_at };
        }

        if now >= session.expires_at {
            return SessionStatus::Expired {
                expired_at: session.expires_at,
            };
        }

        SessionStatus::Active {
            current_index: session.current_index,
        }
    }

    pub fn rejection(&self) -> Option<SessionRejection> {
        match self {
            SessionStatus::Active { .. } => None,
            SessionStatus::Completed { .. } => Some(SessionRejection::Completed),
            SessionStatus::Expired { .. } => Some(SessionRejection::Expired),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuestionView {
    pub viewed_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewAttempt<'a> {
    pub student_id: i64,
    pub quiz_id: i64,
    pub question_id: i64,
    pub student_answer: &'a str,
    pub score: i64,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingVerdict {
    Valid,
    TooQuick,
    TooSlow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizResults {
    pub total_score: i64,
    pub correct_count: i64,
    pub incorrect_count: i64,
    pub total_questions: i64,
    /// Milliseconds.
    pub total_duration: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizRequest {
    #[serde(default)]
    #[validate(custom(function = validate_student_name))]
    pub student_name: String,
    #[serde(default)]
    #[validate(custom(function = validate_section))]
    pub section: String,
}

/// Fields stay optional so that a missing one is reported as a validation error
/// rather than a malformed body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    pub session_token: Option<String>,
    pub question_id: Option<i64>,
    pub answer: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentQuestionQuery {
    pub session_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizResponse {
    pub session_token: String,
    pub question: PublicQuestion,
    pub total_questions: usize,
    pub current_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub correct: bool,
    pub score: i64,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question: Option<PublicQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_questions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<QuizResults>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentQuestionResponse {
    pub question: PublicQuestion,
    pub current_index: usize,
    pub total_questions: usize,
}
