use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::{
    Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::{
    common::{app_state::AppState, clock::ManualClock},
    config::app_config::QuizConfig,
    features::session::{
        models::{StartQuizRequest, SubmitAnswerRequest},
        service::QuizEngine,
    },
};

pub struct TestApp {
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn pool(&self) -> &Pool<Sqlite> {
        self.state.get_pool()
    }

    pub fn engine(&self) -> &QuizEngine {
        self.state.get_engine()
    }

    pub fn now(&self) -> DateTime<Utc> {
        use crate::common::clock::Clock;
        self.clock.now()
    }

    pub fn wait(&self, by: Duration) {
        self.clock.advance(by);
    }
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

/// Fresh in-memory database with migrations applied and a frozen clock.
pub async fn setup_app_state() -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    with_migrations(pool).await
}

/// File-backed database so that several connections write concurrently.
pub async fn setup_shared_app_state(connections: u32) -> TestApp {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let path = std::env::temp_dir().join(format!("quizly_test_{}_{}.db", std::process::id(), id));
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }

    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(connections)
        .connect_with(options)
        .await
        .expect("Failed to open database file");

    with_migrations(pool).await
}

async fn with_migrations(pool: Pool<Sqlite>) -> TestApp {
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let clock = Arc::new(ManualClock::starting_at(epoch()));
    let state = AppState::from_pool(pool, clock.clone(), QuizConfig::default());

    TestApp { state, clock }
}

pub async fn whitelist(pool: &Pool<Sqlite>, name: &str, section: &str) {
    sqlx::query(r#"INSERT INTO "whitelist" (name, section, is_active) VALUES (?1, ?2, 1)"#)
        .bind(name)
        .bind(section)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn create_quiz(
    pool: &Pool<Sqlite>,
    title: &str,
    is_active: bool,
    created_at: DateTime<Utc>,
) -> i64 {
    sqlx::query_scalar(
        r#"INSERT INTO "quizzes" (title, is_active, created_at) VALUES (?1, ?2, ?3) RETURNING id"#,
    )
    .bind(title)
    .bind(is_active)
    .bind(created_at)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_question(
    pool: &Pool<Sqlite>,
    quiz_id: i64,
    text: &str,
    options: &[&str],
    correct_answer: &str,
) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO "questions" (quiz_id, text, options, correct_answer)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id
        "#,
    )
    .bind(quiz_id)
    .bind(text)
    .bind(serde_json::to_string(options).unwrap())
    .bind(correct_answer)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Quiz of `count` "i + i" questions, e.g. "1 + 1" -> "2".
/// Returns the quiz id and a map from question id to correct answer.
pub async fn seed_arithmetic_quiz(pool: &Pool<Sqlite>, count: i64) -> (i64, HashMap<i64, String>) {
    let quiz_id = create_quiz(pool, "Arithmetic", true, epoch()).await;
    let mut answers = HashMap::new();

    for i in 1..=count {
        let answer = (i * 2).to_string();
        let below = (i * 2 - 1).to_string();
        let above = (i * 2 + 1).to_string();
        let id = create_question(
            pool,
            quiz_id,
            &format!("{} + {}", i, i),
            &[below.as_str(), answer.as_str(), above.as_str()],
            &answer,
        )
        .await;
        answers.insert(id, answer);
    }

    (quiz_id, answers)
}

pub async fn count_rows(pool: &Pool<Sqlite>, table: &str) -> i64 {
    sqlx::query_scalar(&format!(r#"SELECT COUNT(*) FROM "{}""#, table))
        .fetch_one(pool)
        .await
        .unwrap()
}

pub fn start_request(name: &str, section: &str) -> StartQuizRequest {
    StartQuizRequest {
        student_name: name.to_string(),
        section: section.to_string(),
    }
}

pub fn answer_request(token: &str, question_id: i64, answer: &str) -> SubmitAnswerRequest {
    SubmitAnswerRequest {
        session_token: Some(token.to_string()),
        question_id: Some(question_id),
        answer: Some(serde_json::Value::String(answer.to_string())),
    }
}
