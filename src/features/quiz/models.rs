use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::codec::{CodecError, decode_list};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Row shape of `questions`; `options` is still encoded.
#[derive(Debug, sqlx::FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub quiz_id: Option<i64>,
    pub text: String,
    pub options: String,
    pub correct_answer: String,
}

/// Never serialized; leaves the service only as a [`PublicQuestion`].
#[derive(Debug, Clone)]
pub struct Question {
    pub id: i64,
    pub quiz_id: Option<i64>,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl TryFrom<QuestionRow> for Question {
    type Error = CodecError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            quiz_id: row.quiz_id,
            text: row.text,
            options: decode_list("questions.options", &row.options)?,
            correct_answer: row.correct_answer,
        })
    }
}

impl Question {
    /// Trimmed, case-insensitive comparison against the stored answer.
    pub fn is_correct(&self, answer: &str) -> bool {
        answer.trim().to_lowercase() == self.correct_answer.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            text: question.text.clone(),
            options: question.options.clone(),
        }
    }
}
