use actix_web::{error::BlockingError, http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::embedder::EmbedderError;
use crate::model::ErrorBody;

/// Failures past request validation. All of them are the server's fault.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("inference failed: {0}")]
    Inference(#[from] EmbedderError),
    #[error("inference worker panicked or is unavailable")]
    WorkerUnavailable,
    #[error("model returned {got} embeddings for {expected} texts")]
    CountMismatch { expected: usize, got: usize },
    #[error("model returned embeddings of mixed dimensions ({expected} and {got})")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("model returned a zero or non-finite embedding for text {index}")]
    Degenerate { index: usize },
}

impl From<BlockingError> for ServiceError {
    fn from(_: BlockingError) -> Self {
        ServiceError::WorkerUnavailable
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::new(self.to_string()))
    }
}
