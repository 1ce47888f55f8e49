/// Error types for rental-service
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Failures raised by a `BookStore` implementation
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Failure while applying a single record; escalates to the whole batch
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Malformed record at {topic}[{partition}]@{offset}: {reason}")]
    Deserialization {
        topic: String,
        partition: i32,
        offset: i64,
        reason: String,
    },
}

/// Dead-letter publication failure. Terminal for the record.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Publish to {topic} failed: {reason}")]
    Failed { topic: String, reason: String },

    #[error("Dead-letter sink closed")]
    Closed,
}

/// Errors surfaced by the HTTP layer
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ResponseError for ServiceError {
    fn error_response(&self) -> HttpResponse {
        let code = self.status_code();
        let message = match self {
            ServiceError::InvalidInput(msg) => msg.clone(),
            ServiceError::Store(_) => "storage unavailable".to_string(),
        };

        HttpResponse::build(code).json(ErrorResponse {
            error: message,
            code: code.as_u16(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServiceError::InvalidInput("size".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Store(StoreError::Unavailable("down".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_store_error_escalates_to_processing_error() {
        let err: ProcessingError = StoreError::Unavailable("pool closed".into()).into();
        assert!(err.to_string().contains("pool closed"));
    }
}
