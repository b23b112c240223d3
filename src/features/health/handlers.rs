use std::sync::Arc;

use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get,
};
use serde_json::json;
use tracing::error;

use crate::{
    common::{app_state::AppState, error::ServerError},
    features::health::repository,
};

pub fn health_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/detailed", get(health_detailed))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    "OK".into_response()
}

async fn health_detailed(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServerError> {
    let platform = true;
    let db_status = match repository::health_check(state.get_pool()).await {
        Ok(_) => true,
        Err(e) => {
            error!("Database health check failed: {}", e);
            false
        }
    };

    let open_sessions = if db_status {
        let now = state.get_clock().now();
        repository::count_open_sessions(state.get_pool(), now)
            .await
            .ok()
    } else {
        None
    };

    let json = json!({
        "platform": platform,
        "database": db_status,
        "open_sessions": open_sessions,
    });

    Ok((StatusCode::OK, Json(json)))
}
