use std::sync::Arc;

use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get,
};

use crate::{
    common::{app_state::AppState, error::ServerError},
    features::quiz::repository::list_active_quizzes,
};

pub fn quiz_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(list_quizzes))
        .with_state(state)
}

async fn list_quizzes(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ServerError> {
    let quizzes = list_active_quizzes(state.get_pool()).await?;
    Ok((StatusCode::OK, Json(quizzes)))
}
