use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::response::{ApiResponse, Meta};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("{0} not found")]
    MissingResource(String),

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Conflict {0}")]
    Conflict(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            // declines carry the provider's text back to the caller
            GatewayError::Declined(msg) => AppError::BadRequest(msg),
            GatewayError::Transport(_) | GatewayError::Protocol(_) => {
                AppError::Gateway(err.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::MissingResource(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::Gateway(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::DbError(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::OrmError(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = ApiResponse {
            message,
            data: Some(ErrorData {
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
