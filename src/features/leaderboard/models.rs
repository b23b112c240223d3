use serde::{Deserialize, Serialize};

/// One ranked student. `duration` is the summed think time in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeaderboardEntry {
    pub student_name: String,
    pub section: Option<String>,
    pub score: i64,
    pub duration: i64,
    pub attempts: i64,
}
