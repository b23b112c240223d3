use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::{
    common::{
        app_state::AppState,
        error::ServerError,
        validation::{JsonBody, QueryParams, parse_quiz_id},
    },
    features::session::models::{CurrentQuestionQuery, StartQuizRequest, SubmitAnswerRequest},
};

pub fn session_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/{quiz_id}/start", post(start_quiz))
        .route("/{quiz_id}/answer", post(submit_answer))
        .route("/{quiz_id}/current", get(current_question))
        .route("/{quiz_id}/leaderboard", get(leaderboard))
        .with_state(state)
}

async fn start_quiz(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<String>,
    JsonBody(request): JsonBody<StartQuizRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let quiz_id = parse_quiz_id(&quiz_id)?;
    let response = state
        .get_engine()
        .start_quiz_session(quiz_id, &request)
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<String>,
    JsonBody(request): JsonBody<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let quiz_id = parse_quiz_id(&quiz_id)?;
    let response = state.get_engine().submit_answer(quiz_id, &request).await?;

    Ok((StatusCode::OK, Json(response)))
}

async fn current_question(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<String>,
    QueryParams(query): QueryParams<CurrentQuestionQuery>,
) -> Result<impl IntoResponse, ServerError> {
    let quiz_id = parse_quiz_id(&quiz_id)?;
    let response = state
        .get_engine()
        .get_current_question(quiz_id, query.session_token.as_deref())
        .await?;

    Ok((StatusCode::OK, Json(response)))
}

async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let quiz_id = parse_quiz_id(&quiz_id)?;
    let entries = state.get_engine().get_leaderboard(quiz_id).await?;

    Ok((StatusCode::OK, Json(entries)))
}
