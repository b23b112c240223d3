use chrono::{DateTime, Duration, Utc};
use rand::{RngCore, SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha20Rng;
use sqlx::{Pool, Sqlite, Transaction};
use tracing::debug;

use crate::{
    common::{codec::encode_list, error::ServerError},
    features::session::models::{
        NewAttempt, QuestionView, QuizResults, QuizSession, QuizSessionRow,
    },
};

const TOKEN_BYTES: usize = 32;

/// 256 bits from an OS-seeded ChaCha20 stream, hex encoded.
pub fn generate_session_token() -> String {
    let mut rng = ChaCha20Rng::from_os_rng();
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.fill_bytes(&mut bytes);

    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Uniform permutation (Fisher–Yates). The seed is not kept.
pub fn shuffle_question_order(question_ids: &[i64]) -> Vec<i64> {
    let mut rng = ChaCha20Rng::from_os_rng();
    let mut order = question_ids.to_vec();
    order.shuffle(&mut rng);
    order
}

pub async fn tx_create_session(
    tx: &mut Transaction<'_, Sqlite>,
    student_id: i64,
    quiz_id: i64,
    question_ids: &[i64],
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<QuizSession, ServerError> {
    let session_token = generate_session_token();
    let question_order = shuffle_question_order(question_ids);
    let expires_at = now + ttl;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO "quiz_sessions"
            (session_token, student_id, quiz_id, question_order, current_index, started_at, expires_at, completed_at)
        VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, NULL)
        RETURNING id
        "#,
    )
    .bind(&session_token)
    .bind(student_id)
    .bind(quiz_id)
    .bind(encode_list("quiz_sessions.question_order", &question_order)?)
    .bind(now)
    .bind(expires_at)
    .fetch_one(&mut **tx)
    .await?;

    debug!("Created session {} for quiz {}", id, quiz_id);

    Ok(QuizSession {
        id,
        session_token,
        student_id,
        quiz_id,
        question_order,
        current_index: 0,
        started_at: now,
        expires_at,
        completed_at: None,
    })
}

pub async fn get_session_by_token(
    pool: &Pool<Sqlite>,
    token: &str,
) -> Result<Option<QuizSession>, ServerError> {
    let row = sqlx::query_as::<_, QuizSessionRow>(
        r#"
        SELECT id, session_token, student_id, quiz_id, question_order, current_index,
            started_at, expires_at, completed_at
        FROM "quiz_sessions"
        WHERE session_token = ?1
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(QuizSession::try_from(row)?)),
        None => Ok(None),
    }
}

pub async fn has_existing_session(
    pool: &Pool<Sqlite>,
    student_id: i64,
    quiz_id: i64,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM "quiz_sessions"
            WHERE student_id = ?1 AND quiz_id = ?2
        )
        "#,
    )
    .bind(student_id)
    .bind(quiz_id)
    .fetch_one(pool)
    .await
}

/// Moves the pointer only if nobody else moved it first. Returns false on a lost race.
pub async fn tx_advance_session(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: i64,
    expected_index: usize,
    new_index: usize,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        UPDATE "quiz_sessions"
        SET current_index = ?1
        WHERE id = ?2 AND current_index = ?3 AND completed_at IS NULL
        "#,
    )
    .bind(new_index as i64)
    .bind(session_id)
    .bind(expected_index as i64)
    .execute(&mut **tx)
    .await?;

    Ok(row.rows_affected() == 1)
}

pub async fn tx_complete_session(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        UPDATE "quiz_sessions"
        SET completed_at = ?1
        WHERE id = ?2 AND completed_at IS NULL
        "#,
    )
    .bind(now)
    .bind(session_id)
    .execute(&mut **tx)
    .await?;

    Ok(row.rows_affected() == 1)
}

pub async fn tx_record_view(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: i64,
    question_id: i64,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "question_views" (session_id, question_id, viewed_at, answered_at)
        VALUES (?1, ?2, ?3, NULL)
        ON CONFLICT (session_id, question_id) DO NOTHING
        "#,
    )
    .bind(session_id)
    .bind(question_id)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Stamps `answered_at` once. Returns false if it was already stamped.
pub async fn tx_mark_answered(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: i64,
    question_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        UPDATE "question_views"
        SET answered_at = ?1
        WHERE session_id = ?2 AND question_id = ?3 AND answered_at IS NULL
        "#,
    )
    .bind(now)
    .bind(session_id)
    .bind(question_id)
    .execute(&mut **tx)
    .await?;

    Ok(row.rows_affected() == 1)
}

pub async fn get_view(
    pool: &Pool<Sqlite>,
    session_id: i64,
    question_id: i64,
) -> Result<Option<QuestionView>, sqlx::Error> {
    sqlx::query_as::<_, QuestionView>(
        r#"
        SELECT viewed_at, answered_at
        FROM "question_views"
        WHERE session_id = ?1 AND question_id = ?2
        "#,
    )
    .bind(session_id)
    .bind(question_id)
    .fetch_optional(pool)
    .await
}

pub async fn tx_create_attempt(
    tx: &mut Transaction<'_, Sqlite>,
    attempt: &NewAttempt<'_>,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "attempts"
            (student_id, quiz_id, question_id, student_answer, score, duration_ms, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(attempt.student_id)
    .bind(attempt.quiz_id)
    .bind(attempt.question_id)
    .bind(attempt.student_answer)
    .bind(attempt.score)
    .bind(attempt.duration_ms)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Aggregates the attempts of one student on one quiz.
pub async fn tx_session_totals(
    tx: &mut Transaction<'_, Sqlite>,
    student_id: i64,
    quiz_id: i64,
) -> Result<QuizResults, sqlx::Error> {
    sqlx::query_as::<_, QuizResults>(
        r#"
        SELECT
            COALESCE(SUM(score), 0) AS total_score,
            COALESCE(SUM(CASE WHEN score > 0 THEN 1 ELSE 0 END), 0) AS correct_count,
            COALESCE(SUM(CASE WHEN score > 0 THEN 0 ELSE 1 END), 0) AS incorrect_count,
            COUNT(*) AS total_questions,
            COALESCE(SUM(duration_ms), 0) AS total_duration
        FROM "attempts"
        WHERE student_id = ?1 AND quiz_id = ?2
        "#,
    )
    .bind(student_id)
    .bind(quiz_id)
    .fetch_one(&mut **tx)
    .await
}
