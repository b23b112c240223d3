use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    common::{app_state::AppState, error::expose_error_details},
    config::app_config::{CONFIG, Runtime},
    features::{
        health::handlers::health_routes, quiz::handlers::quiz_routes,
        session::handlers::session_routes,
    },
};

mod common;
mod config;
mod features;
mod tests;

#[tokio::main]
async fn main() {
    // Initialize .env
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    expose_error_details(CONFIG.runtime != Runtime::Prod);

    // Initialize state
    let state = AppState::from_connection_string(
        &CONFIG.database.url,
        CONFIG.database.max_connections,
        CONFIG.quiz.clone(),
    )
    .await
    .unwrap_or_else(|e| panic!("{}", e));

    // Run migrations
    if let Err(e) = state.run_migrations().await {
        error!("Failed to run migrations: {}", e);
        return;
    }

    let app = app(state);

    // Initialize webserver
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", CONFIG.server.address, CONFIG.server.port))
            .await
            .unwrap_or_else(|e| panic!("Failed to bind listener: {}", e));

    info!(
        "Server running in {} mode, listening on address: {:?}",
        CONFIG.runtime,
        listener.local_addr()
    );

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server stopped: {}", e);
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    let quiz_api = quiz_routes(state.clone()).merge(session_routes(state.clone()));

    Router::new()
        .nest("/health", health_routes(state.clone()))
        .nest("/quizzes", quiz_api)
}
