use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use once_cell::sync::OnceCell;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::common::codec::CodecError;

static EXPOSE_DETAILS: OnceCell<bool> = OnceCell::new();

/// Lets error bodies carry the underlying cause. Set once at startup, never in production.
pub fn expose_error_details(expose: bool) {
    let _ = EXPOSE_DETAILS.set(expose);
}

fn details_exposed() -> bool {
    EXPOSE_DETAILS.get().copied().unwrap_or(false)
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Sqlx failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Corrupt stored data: {0}")]
    Codec(#[from] CodecError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Session rejected: {0}")]
    Session(#[from] SessionRejection),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Why a session token or a submitted question was refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionRejection {
    #[error("Invalid session token")]
    InvalidSession,

    #[error("Session has expired")]
    Expired,

    #[error("Session is already completed")]
    Completed,

    #[error("Session does not belong to this quiz")]
    QuizMismatch,

    #[error("Question is not the current question of this session")]
    QuestionMismatch,

    #[error("Question has not been viewed in this session")]
    NotViewed,

    #[error("Question has already been answered")]
    AlreadyAnswered,

    #[error("Answer submitted too quickly")]
    TooQuick,

    #[error("Answer submitted too slowly")]
    TooSlow,
}

impl SessionRejection {
    pub fn code(&self) -> &'static str {
        match self {
            SessionRejection::InvalidSession => "INVALID_SESSION",
            SessionRejection::Expired => "SESSION_EXPIRED",
            SessionRejection::Completed => "SESSION_COMPLETED",
            SessionRejection::QuizMismatch => "QUIZ_MISMATCH",
            SessionRejection::QuestionMismatch => "QUESTION_MISMATCH",
            SessionRejection::NotViewed => "QUESTION_NOT_VIEWED",
            SessionRejection::AlreadyAnswered => "ALREADY_ANSWERED",
            SessionRejection::TooQuick => "ANSWER_TOO_QUICK",
            SessionRejection::TooSlow => "ANSWER_TOO_SLOW",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SessionRejection::AlreadyAnswered => StatusCode::CONFLICT,
            SessionRejection::TooQuick | SessionRejection::TooSlow => StatusCode::BAD_REQUEST,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl ServerError {
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::Sqlx(_) | ServerError::Migration(_) | ServerError::Codec(_) => {
                "DATABASE_ERROR"
            }
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Validation(_) => "VALIDATION_ERROR",
            ServerError::Session(rejection) => rejection.code(),
            ServerError::Forbidden(_) => "FORBIDDEN",
            ServerError::NotFound(_) => "NOT_FOUND",
            ServerError::Conflict(_) => "CONFLICT",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Sqlx(_)
            | ServerError::Migration(_)
            | ServerError::Codec(_)
            | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::Session(rejection) => rejection.status(),
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            ServerError::Sqlx(e) => {
                error!("Sqlx failed with error: {:?}", e);
                String::from("A database error occurred")
            }
            ServerError::Migration(e) => {
                error!("Migration failed with error: {:?}", e);
                String::from("A database error occurred")
            }
            ServerError::Codec(e) => {
                error!("Stored data could not be decoded: {}", e);
                String::from("A database error occurred")
            }
            ServerError::Internal(e) => {
                error!("Internal server error: {}", e);
                String::from("Internal server error")
            }
            ServerError::Validation(msg) => {
                info!("Validation error: {}", msg);
                msg.clone()
            }
            ServerError::Session(rejection) => {
                warn!("Session rejected: {}", rejection);
                rejection.to_string()
            }
            ServerError::Forbidden(msg) => {
                warn!("Forbidden: {}", msg);
                msg.clone()
            }
            ServerError::NotFound(msg) => {
                warn!("Entity not found: {}", msg);
                msg.clone()
            }
            ServerError::Conflict(msg) => {
                warn!("Conflict: {}", msg);
                msg.clone()
            }
        };

        let body = if status.is_server_error() && details_exposed() {
            json!({ "code": code, "message": message, "detail": self.to_string() })
        } else {
            json!({ "code": code, "message": message })
        };

        (status, Json(body)).into_response()
    }
}
