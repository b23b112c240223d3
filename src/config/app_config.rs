use core::fmt;
use std::env;

use chrono::Duration;
use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub static CONFIG: Lazy<AppConfig> =
    Lazy::new(|| AppConfig::load().unwrap_or_else(|e| panic!("{}", e)));

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Runtime {
    #[default]
    Dev,
    Prod,
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Runtime::Dev => write!(f, "development"),
            Runtime::Prod => write!(f, "production"),
        }
    }
}

impl From<String> for Runtime {
    fn from(value: String) -> Self {
        match value.as_str() {
            "DEVELOPMENT" => Runtime::Dev,
            "PRODUCTION" => Runtime::Prod,
            _ => Runtime::Prod,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(skip)]
    pub runtime: Runtime,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub quiz: QuizConfig,
}

fn default_address() -> String {
    "127.0.0.1".into()
}

fn default_port() -> String {
    "3000".into()
}

fn default_max_connections() -> u32 {
    5
}

fn default_session_ttl_secs() -> i64 {
    30 * 60
}

fn default_min_question_secs() -> i64 {
    1
}

fn default_max_question_secs() -> i64 {
    10 * 60
}

fn default_leaderboard_size() -> i64 {
    5
}

fn default_points_per_correct() -> i64 {
    1
}

fn default_catalog_cache_ttl_secs() -> u64 {
    300
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Rules the quiz engine enforces. Injected into the engine so tests can tune them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: i64,
    #[serde(default = "default_min_question_secs")]
    pub min_question_secs: i64,
    #[serde(default = "default_max_question_secs")]
    pub max_question_secs: i64,
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: i64,
    #[serde(default = "default_points_per_correct")]
    pub points_per_correct: i64,
    #[serde(default = "default_catalog_cache_ttl_secs")]
    pub catalog_cache_ttl_secs: u64,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl_secs(),
            min_question_secs: default_min_question_secs(),
            max_question_secs: default_max_question_secs(),
            leaderboard_size: default_leaderboard_size(),
            points_per_correct: default_points_per_correct(),
            catalog_cache_ttl_secs: default_catalog_cache_ttl_secs(),
        }
    }
}

impl QuizConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.session_ttl_secs)
    }

    pub fn min_question_time(&self) -> Duration {
        Duration::seconds(self.min_question_secs)
    }

    pub fn max_question_time(&self) -> Duration {
        Duration::seconds(self.max_question_secs)
    }
}

impl AppConfig {
    fn load() -> Result<Self, ConfigError> {
        let runtime: Runtime = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "DEVELOPMENT".into())
            .into();

        let mut config: AppConfig = Config::builder()
            .add_source(File::with_name(&format!("src/config/{}.toml", runtime)))
            .add_source(Environment::with_prefix("QUIZLY").separator("__"))
            .build()?
            .try_deserialize()?;
        config.runtime = runtime;

        debug!(
            "Loaded config: {}",
            serde_json::to_string_pretty(&config).unwrap_or_default()
        );

        Ok(config)
    }
}
