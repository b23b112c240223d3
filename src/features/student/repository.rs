use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::debug;

use crate::features::student::models::Student;

fn normalize_section(section: Option<&str>) -> Option<&str> {
    section.map(str::trim).filter(|s| !s.is_empty())
}

pub async fn find_student(
    pool: &Pool<Sqlite>,
    name: &str,
    section: Option<&str>,
) -> Result<Option<Student>, sqlx::Error> {
    let section = normalize_section(section);

    sqlx::query_as::<_, Student>(
        r#"
        SELECT id, name, section, created_at
        FROM "students"
        WHERE LOWER(name) = LOWER(?1)
          AND COALESCE(LOWER(section), '') = COALESCE(LOWER(?2), '')
        "#,
    )
    .bind(name.trim())
    .bind(section)
    .fetch_optional(pool)
    .await
}

/// Never updates an existing row. A concurrent insert of the same identity is
/// swallowed by the unique index and the winner's row is returned.
pub async fn find_or_create_student(
    pool: &Pool<Sqlite>,
    name: &str,
    section: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Student, sqlx::Error> {
    if let Some(student) = find_student(pool, name, section).await? {
        return Ok(student);
    }

    let row = sqlx::query(
        r#"
        INSERT INTO "students" (name, section, created_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(name.trim())
    .bind(normalize_section(section))
    .bind(now)
    .execute(pool)
    .await?;

    if row.rows_affected() == 0 {
        debug!("Student was created concurrently, reading existing row");
    }

    find_student(pool, name, section)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}
