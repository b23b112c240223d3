use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

pub async fn health_check(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
    let _ = sqlx::query("SELECT 1 as one").fetch_one(pool).await?;
    Ok(())
}

/// Number of sessions neither completed nor past their expiry at `now`.
pub async fn count_open_sessions(
    pool: &Pool<Sqlite>,
    now: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM "quiz_sessions"
        WHERE completed_at IS NULL AND expires_at > ?1
        "#,
    )
    .bind(now)
    .fetch_one(pool)
    .await
}
