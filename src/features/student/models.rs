use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub id: i64,
    pub name: String,
    /// `None` is its own identity bucket, distinct from every named section.
    pub section: Option<String>,
    pub created_at: DateTime<Utc>,
}
