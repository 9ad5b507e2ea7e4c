//! HTTP mapping for core errors.
//!
//! Every handler returns `ApiError`, which renders as
//! `{"status": "error", "message": ...}` with a status code chosen per
//! variant. Storage and crypto details are logged, never sent.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use parley_core::ChatError;
use parley_types::api::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// A required request field was absent.
    #[error("Missing data")]
    MissingData,

    /// The body, query string or path could not be decoded.
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingData | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Chat(err) => match err {
                ChatError::InvalidInput(_) | ChatError::InvalidRelationship(_) => {
                    StatusCode::BAD_REQUEST
                }
                ChatError::RecipientNotFound(_)
                | ChatError::UserNotFound(_)
                | ChatError::GroupNotFound(_)
                | ChatError::MessageNotFound(_)
                | ChatError::EdgeNotFound(_)
                | ChatError::NotMember => StatusCode::NOT_FOUND,
                ChatError::Forbidden(_) => StatusCode::FORBIDDEN,
                ChatError::RelationshipExists
                | ChatError::InvalidTransition { .. }
                | ChatError::Conflict(_)
                | ChatError::AlreadyMember
                | ChatError::UsernameTaken
                | ChatError::EmailTaken => StatusCode::CONFLICT,
                ChatError::Crypto(_) | ChatError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Chat(ChatError::RecipientNotFound(_)) => "User not found".to_string(),
            ApiError::Chat(err @ (ChatError::Crypto(_) | ChatError::Storage(_))) => {
                error!("Request failed: {:#}", err);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            status: "error",
            message,
        });
        (status, body).into_response()
    }
}
