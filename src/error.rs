//! Typed errors and HTTP mapping.

use crate::response::ApiError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),
    #[error("resource '{resource}': unknown column '{column}'")]
    UnknownColumn { resource: String, column: String },
    #[error("resource '{resource}': invalid primary key '{column}'")]
    InvalidPrimaryKey { resource: String, column: String },
    #[error("resource '{resource}': expansion references unknown resource '{target}'")]
    UnknownExpansion { resource: String, target: String },
    #[error("unknown resource '{0}'")]
    UnknownResource(String),
    #[error("duplicate resource: {0}")]
    DuplicateResource(String),
    #[error("resource '{resource}': {route} route requires {params}")]
    MissingParams {
        resource: String,
        route: &'static str,
        params: &'static str,
    },
    #[error("settings: {0}")]
    Settings(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    BadRequest(String),
    /// Conditional request matched; carries the cache headers to repeat on the 304.
    #[error("not modified")]
    NotModified(axum::http::HeaderMap),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("store: {0}")]
    Store(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotModified(_) => StatusCode::NOT_MODIFIED,
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            AppError::NotModified(headers) => return (status, headers).into_response(),
            AppError::Db(ref e) if status.is_server_error() => {
                tracing::error!(error = %e, "database error");
                "internal server error".to_string()
            }
            ref other if status.is_server_error() => {
                tracing::error!(error = %other, "request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ApiError::new(detail))).into_response()
    }
}
