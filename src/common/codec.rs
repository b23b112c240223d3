//! Encoding of list-valued columns (`questions.options`, `quiz_sessions.question_order`).
//! SQLite has no array type, so these are stored as JSON text.

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to encode column {column}: {source}")]
    Encode {
        column: &'static str,
        source: serde_json::Error,
    },

    #[error("Column {column} holds malformed data: {source}")]
    Decode {
        column: &'static str,
        source: serde_json::Error,
    },

    #[error("Column {column} must not be empty")]
    Empty { column: &'static str },

    #[error("Column {column} contains duplicate entries")]
    Duplicates { column: &'static str },
}

pub fn encode_list<T: Serialize>(column: &'static str, items: &[T]) -> Result<String, CodecError> {
    serde_json::to_string(items).map_err(|source| CodecError::Encode { column, source })
}

pub fn decode_list<T: DeserializeOwned>(
    column: &'static str,
    raw: &str,
) -> Result<Vec<T>, CodecError> {
    serde_json::from_str(raw).map_err(|source| CodecError::Decode { column, source })
}

/// Decodes a list of ids that must be non-empty and free of repeats.
pub fn decode_id_order(column: &'static str, raw: &str) -> Result<Vec<i64>, CodecError> {
    let ids: Vec<i64> = decode_list(column, raw)?;

    if ids.is_empty() {
        return Err(CodecError::Empty { column });
    }

    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    if !ids.iter().all(|id| seen.insert(*id)) {
        return Err(CodecError::Duplicates { column });
    }

    Ok(ids)
}
