use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::error;
use usecases::UseCaseError;

/// The three error shapes the original system produces, carried over
/// verbatim: domain validation, request/DTO validation, and everything
/// else (logged, never leaked).
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid request")]
    RequestValidation(Vec<String>),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
    #[error("not found")]
    NotFound,
}

#[derive(Serialize)]
struct ErrorBody {
    detail: Value,
    error_type: &'static str,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            HttpError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    detail: Value::String(msg.clone()),
                    error_type: "ValidationError",
                },
            ),
            HttpError::RequestValidation(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    detail: Value::Array(
                        errors.iter().cloned().map(Value::String).collect(),
                    ),
                    error_type: "RequestValidationError",
                },
            ),
            HttpError::NotFound => {
                return StatusCode::NOT_FOUND.into_response();
            }
            HttpError::Internal(err) => {
                error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        detail: Value::String("Internal server error".to_string()),
                        error_type: "InternalServerError",
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<UseCaseError> for HttpError {
    fn from(err: UseCaseError) -> Self {
        match err {
            UseCaseError::Validation(e) => HttpError::Validation(e.to_string()),
            other => HttpError::Internal(anyhow::anyhow!(other)),
        }
    }
}
