use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::{claim::ClaimError, db::StoreError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Missing or unusable request field. The message goes back to the client.
    #[error("{0}")]
    Validation(String),

    #[error("Not Found")]
    NotFound,

    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, Some(message.clone())),
            AppError::NotFound => return StatusCode::NOT_FOUND.into_response(),
            AppError::Claim(ClaimError::Exhausted { .. } | ClaimError::DeadlineElapsed(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, Some(self.to_string()))
            }
            AppError::Claim(ClaimError::Store(_)) | AppError::Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };

        if status.is_server_error() {
            error!("{status}: {self:?}");
        }

        let body = Json(json!({
            "error": message.unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_owned()),
        }));
        (status, body).into_response()
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        Self::Validation(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self::Validation(err.to_owned())
    }
}
