use sqlx::{Pool, Sqlite};

use crate::features::leaderboard::models::LeaderboardEntry;

/// Highest total score first, faster total time breaks ties.
pub async fn get_leaderboard(
    pool: &Pool<Sqlite>,
    quiz_id: i64,
    limit: i64,
) -> Result<Vec<LeaderboardEntry>, sqlx::Error> {
    sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT
            s.name AS student_name,
            s.section AS section,
            SUM(a.score) AS score,
            SUM(a.duration_ms) AS duration,
            COUNT(*) AS attempts
        FROM "attempts" a
        JOIN "students" s ON s.id = a.student_id
        WHERE a.quiz_id = ?1
        GROUP BY a.student_id, s.name, s.section
        ORDER BY score DESC, duration ASC, a.student_id ASC
        LIMIT ?2
        "#,
    )
    .bind(quiz_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
