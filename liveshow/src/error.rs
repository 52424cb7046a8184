use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;

use crate::media::MediaError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("a broadcast is already active: {0}")]
    BroadcastActive(String),

    #[error("no active broadcast")]
    NoActiveBroadcast,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("scheduler is not running")]
    SchedulerClosed,

    #[error(transparent)]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::Validation(t.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AppError::Unavailable(msg),
            StoreError::NotFound(id) => AppError::SessionNotFound(id),
            err @ StoreError::Conflict { .. } => AppError::Conflict(err.to_string()),
            StoreError::Rejected(msg) => AppError::InternalServerError(anyhow::anyhow!(msg)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::BroadcastActive(_) | AppError::NoActiveBroadcast => {
                StatusCode::CONFLICT
            }
            AppError::Media(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unavailable(_) | AppError::SchedulerClosed => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
