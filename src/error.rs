use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::core::{PostId, UserId};

#[derive(Debug)]
pub enum AppError {
    DatabaseError(String),
    NotFound(String),
    // Exists but hidden from the viewer. Rendered exactly like NotFound.
    NotVisible(String),
    NotLoggedIn,
    AccessDenied(String),
    InvalidTarget(String),
    DuplicateVote { user_id: UserId, post_id: PostId },
    VoteNotFound { user_id: UserId, post_id: PostId },
    ValidationFailed(Vec<String>),
    BadRequest(String),
    Internal(String),
    ConfigurationError(String),
}

impl AppError {
    /// Store-level conflicts that the client can resolve by changing its request
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::DuplicateVote { .. } | AppError::VoteNotFound { .. })
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::NotVisible(msg) => write!(f, "Not visible: {}", msg),
            AppError::NotLoggedIn => write!(f, "Not logged in"),
            AppError::AccessDenied(msg) => write!(f, "Access denied: {}", msg),
            AppError::InvalidTarget(msg) => write!(f, "Invalid target: {}", msg),
            AppError::DuplicateVote { user_id, post_id } => {
                write!(f, "User {} has already voted on post {}", user_id, post_id)
            }
            AppError::VoteNotFound { user_id, post_id } => {
                write!(f, "User {} has not voted on post {}", user_id, post_id)
            }
            AppError::ValidationFailed(errors) => {
                write!(f, "Validation failed: {}", errors.join(", "))
            }
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, errors) = match &self {
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    vec!["Internal server error".to_string()],
                )
            }
            AppError::NotFound(_) | AppError::NotVisible(_) => {
                tracing::debug!("Resource hidden or missing: {}", self);
                (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    vec!["The requested resource could not be found".to_string()],
                )
            }
            AppError::NotLoggedIn => (
                StatusCode::FORBIDDEN,
                "not_logged_in",
                vec!["You need to be logged in to do that".to_string()],
            ),
            AppError::AccessDenied(_) => (
                StatusCode::FORBIDDEN,
                "invalid_access",
                vec!["You are not permitted to perform that action".to_string()],
            ),
            AppError::InvalidTarget(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_parameters", vec![msg.clone()])
            }
            AppError::DuplicateVote { .. } | AppError::VoteNotFound { .. } => {
                (StatusCode::CONFLICT, "conflict", vec![self.to_string()])
            }
            AppError::ValidationFailed(errors) => {
                (StatusCode::FORBIDDEN, "validation_failed", errors.clone())
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_parameters", vec![msg.clone()])
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    vec!["Internal server error".to_string()],
                )
            }
            AppError::ConfigurationError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    vec!["Internal server error".to_string()],
                )
            }
        };

        let body = Json(json!({
            "error_type": error_type,
            "errors": errors,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_visible_is_indistinguishable_from_not_found() {
        let hidden = render(AppError::NotVisible("post 12 in private topic".into())).await;
        let missing = render(AppError::NotFound("post 12".into())).await;

        assert_eq!(hidden, missing);
        assert_eq!(hidden.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_validation_errors_render_as_list() {
        let (status, body) = render(AppError::ValidationFailed(vec![
            "Raw is too short".into(),
            "Post has too many comments".into(),
        ]))
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_vote_conflicts_map_to_conflict_status() {
        let err = AppError::DuplicateVote {
            user_id: UserId(1),
            post_id: PostId(2),
        };
        assert!(err.is_conflict());

        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error_type"], "conflict");
    }
}
