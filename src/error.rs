use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{retry::UpstreamError, validation::FieldErrors};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Field-level problems with the request body, rendered as the error map itself.
    #[error("request validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Also used for resources owned by another user.
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            Self::BadRequest(msg) => error_body(StatusCode::BAD_REQUEST, msg),
            Self::Unauthorized(msg) => error_body(StatusCode::UNAUTHORIZED, msg),
            Self::NotFound(msg) => error_body(StatusCode::NOT_FOUND, msg),
            Self::Upstream(err) => {
                tracing::warn!(error = %err, "upstream request failed");
                error_body(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            err @ (Self::Db(_) | Self::Internal(_)) => {
                tracing::error!(error = %err, "internal error");
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        }
    }
}

fn error_body(status: StatusCode, msg: String) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}

pub type AppResult<T> = Result<T, AppError>;
