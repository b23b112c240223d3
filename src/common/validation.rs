use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use validator::{Validate, ValidationError};

use crate::common::error::ServerError;

/// JSON body extractor that rejects with the crate's error body instead of axum's plain text.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Send + 'static,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ServerError::Validation("Expected JSON".to_string()))?;

        if !content_type.starts_with("application/json") {
            return Err(ServerError::Validation("Expected JSON".to_string()));
        }

        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(e) => {
                debug!("Rejected request body: {}", e);
                Err(ServerError::Validation("Invalid JSON".into()))
            }
        }
    }
}

/// Query string extractor with the same rejection shape as [`JsonBody`].
#[derive(Debug)]
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(e) => {
                debug!("Rejected query string: {}", e);
                Err(ServerError::Validation("Invalid query string".into()))
            }
        }
    }
}

/// Runs the `validator` rules of a request and converts failures into a 400.
pub fn validate_input<T: Validate>(value: &T) -> Result<(), ServerError> {
    match value.validate() {
        Ok(_) => Ok(()),
        Err(e) => {
            let error_msg = format_validation_errors(&e);
            info!("Validation error: {}", error_msg);
            Err(ServerError::Validation(error_msg))
        }
    }
}

/// Format validation errors into a user-friendly message
fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let msg = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{} validation failed", field));
            messages.push(msg);
        }
    }

    if messages.is_empty() {
        "Validation failed".to_string()
    } else {
        messages.sort();
        messages.join(", ")
    }
}

/// Validate student name: 2-255 chars after trimming
pub fn validate_student_name(name: &str) -> Result<(), ValidationError> {
    let len = name.trim().chars().count();

    if len < 2 {
        return Err(ValidationError::new("name_too_short")
            .with_message("Student name must be at least 2 characters".into()));
    }

    if len > 255 {
        return Err(ValidationError::new("name_too_long")
            .with_message("Student name must be at most 255 characters".into()));
    }

    Ok(())
}

/// Validate section: a blank or whitespace-only section counts as missing
pub fn validate_section(section: &str) -> Result<(), ValidationError> {
    if section.trim().is_empty() {
        return Err(ValidationError::new("section_missing")
            .with_message("Section is required".into()));
    }

    Ok(())
}

/// Quiz ids arrive as path segments; only positive integers are accepted.
pub fn parse_quiz_id(raw: &str) -> Result<i64, ServerError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ServerError::Validation(
            "Quiz id must be a positive integer".into(),
        )),
    }
}

pub fn ensure_quiz_id(quiz_id: i64) -> Result<i64, ServerError> {
    if quiz_id > 0 {
        Ok(quiz_id)
    } else {
        Err(ServerError::Validation(
            "Quiz id must be a positive integer".into(),
        ))
    }
}
