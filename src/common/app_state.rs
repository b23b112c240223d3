use std::{str::FromStr, sync::Arc, time::Duration};

use sqlx::{
    Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::info;

use crate::{
    common::{
        clock::{Clock, SystemClock},
        error::ServerError,
    },
    config::app_config::QuizConfig,
    features::session::service::QuizEngine,
};

#[derive(Clone)]
pub struct AppState {
    pool: Pool<Sqlite>,
    clock: Arc<dyn Clock>,
    engine: QuizEngine,
}

impl AppState {
    pub async fn from_connection_string(
        connection_string: &str,
        max_connections: u32,
        rules: QuizConfig,
    ) -> Result<Arc<Self>, ServerError> {
        let options = SqliteConnectOptions::from_str(connection_string)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await?;

        info!("Database connected");
        Ok(Self::from_pool(pool, Arc::new(SystemClock), rules))
    }

    /// Composition root: every collaborator shares the one pool handed in here.
    pub fn from_pool(pool: Pool<Sqlite>, clock: Arc<dyn Clock>, rules: QuizConfig) -> Arc<Self> {
        let engine = QuizEngine::new(pool.clone(), clock.clone(), rules);
        Arc::new(Self {
            pool,
            clock,
            engine,
        })
    }

    pub async fn run_migrations(&self) -> Result<(), ServerError> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }

    pub fn get_pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub fn get_clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn get_engine(&self) -> &QuizEngine {
        &self.engine
    }
}
