use sqlx::{Pool, Sqlite};

use crate::{
    common::error::ServerError,
    features::quiz::models::{Question, QuestionRow, Quiz},
};

pub async fn list_active_quizzes(pool: &Pool<Sqlite>) -> Result<Vec<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, title, is_active, created_at
        FROM "quizzes"
        WHERE is_active = 1
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn get_quiz_by_id(pool: &Pool<Sqlite>, quiz_id: i64) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, title, is_active, created_at
        FROM "quizzes"
        WHERE id = ?1
        "#,
    )
    .bind(quiz_id)
    .fetch_optional(pool)
    .await
}

/// Questions in insertion order. An empty result is not an error here.
pub async fn get_questions_for_quiz(
    pool: &Pool<Sqlite>,
    quiz_id: i64,
) -> Result<Vec<Question>, ServerError> {
    let rows = sqlx::query_as::<_, QuestionRow>(
        r#"
        SELECT id, quiz_id, text, options, correct_answer
        FROM "questions"
        WHERE quiz_id = ?1
        ORDER BY id ASC
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let questions = rows
        .into_iter()
        .map(Question::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(questions)
}
