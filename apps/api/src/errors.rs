use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::roadmap::KeyParseError;
use crate::progression::CommandError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The request is well-formed but breaks a progression rule.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<CommandError> for AppError {
    fn from(err: CommandError) -> Self {
        let message = err.to_string();
        match err {
            CommandError::UnknownResource(_)
            | CommandError::ModuleOutOfRange { .. }
            | CommandError::NoAssessment => AppError::NotFound(message),
            CommandError::IneligibleTransition { .. } => AppError::Conflict(message),
            CommandError::ScoreOutOfRange(_)
            | CommandError::EmptyInterviewContext
            | CommandError::AnswerCountMismatch { .. } => AppError::Validation(message),
        }
    }
}

impl From<KeyParseError> for AppError {
    fn from(err: KeyParseError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "INELIGIBLE_TRANSITION", msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::roadmap::ResourceKey;
    use crate::progression::IneligibleReason;

    #[test]
    fn test_command_errors_map_to_status_codes() {
        let key = ResourceKey::new(0, 0, 1);
        let cases = [
            (CommandError::UnknownResource(key), StatusCode::NOT_FOUND),
            (
                CommandError::IneligibleTransition {
                    key,
                    reason: IneligibleReason::NotFrontier,
                },
                StatusCode::CONFLICT,
            ),
            (CommandError::ScoreOutOfRange(120), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }
}
