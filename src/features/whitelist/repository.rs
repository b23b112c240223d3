use sqlx::{Pool, Sqlite};

/// Case-insensitive lookup against the active roster.
pub async fn is_whitelisted(
    pool: &Pool<Sqlite>,
    name: &str,
    section: &str,
) -> Result<bool, sqlx::Error> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM "whitelist"
            WHERE LOWER(name) = LOWER(?1)
              AND LOWER(section) = LOWER(?2)
              AND is_active = 1
        )
        "#,
    )
    .bind(name.trim())
    .bind(section.trim())
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
