use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::crypto::CryptoError;
use crate::views;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("username '{0}' already exists")]
    DuplicateUser(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Store(ref e) => {
                log::error!("Storage failure: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Crypto(ref e) => {
                log::error!("Password hashing failure: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Html(views::error_page(status))).into_response()
    }
}
