use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use sea_orm::DbErr;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Cannot find product with id = {0}")]
    NotFound(i64),

    #[error("Product with name '{0}' already exists")]
    DuplicateName(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("You can upload maximum {0} images")]
    TooManyImages(usize),

    #[error("File is too large! Maximum size is {}MB.", .0 / (1024 * 1024))]
    FileTooLarge(u64),

    #[error("File must be an image.")]
    UnsupportedMediaType,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ProductResult<T> = Result<T, ProductError>;

/// Convert ProductError to AppError for standardized error responses
impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        let message = err.to_string();
        match err {
            ProductError::NotFound(_) => AppError::NotFound(message),
            ProductError::DuplicateName(_) => AppError::Conflict(message),
            ProductError::Validation(msg) => AppError::BadRequest(msg),
            ProductError::TooManyImages(_) => AppError::BadRequest(message),
            ProductError::FileTooLarge(_) => AppError::PayloadTooLarge(message),
            ProductError::UnsupportedMediaType => AppError::UnsupportedMediaType(message),
            ProductError::Storage(StorageError::InvalidImage(_)) => AppError::BadRequest(message),
            ProductError::Storage(StorageError::Io(e)) => AppError::Io(e),
            ProductError::Database(e) => AppError::Database(e.to_string()),
            ProductError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for ProductError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status_of(err: ProductError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ProductError::NotFound(7).to_string(),
            "Cannot find product with id = 7"
        );
        assert_eq!(
            ProductError::TooManyImages(5).to_string(),
            "You can upload maximum 5 images"
        );
        assert_eq!(
            ProductError::FileTooLarge(10 * 1024 * 1024).to_string(),
            "File is too large! Maximum size is 10MB."
        );
        assert_eq!(
            ProductError::UnsupportedMediaType.to_string(),
            "File must be an image."
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_of(ProductError::NotFound(1)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(ProductError::DuplicateName("Lamp".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ProductError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ProductError::TooManyImages(5)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ProductError::FileTooLarge(1024)),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_of(ProductError::UnsupportedMediaType),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            status_of(ProductError::Storage(StorageError::Io(std::io::Error::other(
                "disk full"
            )))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(ProductError::Database(DbErr::Custom("boom".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
