use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::response::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    /// JSON body that is malformed or does not match the expected shape.
    #[error("{}", .0.body_text())]
    InvalidBody(#[from] JsonRejection),

    /// Handlers disagree on how a missing entity is reported, so the status
    /// travels with the error.
    #[error("{message}")]
    NotFound { status: StatusCode, message: String },

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("File storage error")]
    Io(#[from] std::io::Error),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn unauthorized() -> Self {
        AppError::Unauthorized("The User is not authorized".into())
    }

    pub fn not_found(status: StatusCode, message: impl Into<String>) -> Self {
        AppError::NotFound {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) | AppError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { status, .. } => *status,
            AppError::DbError(_)
            | AppError::OrmError(_)
            | AppError::Io(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::DbError(err) => tracing::error!(error = %err, "database failure"),
            AppError::OrmError(err) => tracing::error!(error = %err, "orm failure"),
            AppError::Io(err) => tracing::error!(error = %err, "file storage failure"),
            AppError::Internal(err) => tracing::error!(error = %err, "internal failure"),
            _ => tracing::debug!(status = %status, error = %self, "request rejected"),
        }

        let body = ApiResponse::<()>::failure(self.to_string());
        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
