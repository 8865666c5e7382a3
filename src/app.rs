use std::sync::Arc;

use actix_web::web;
use tracing::debug;

use crate::embedder::{l2_normalize, Embedder};
use crate::error::ServiceError;
use crate::model::{EmbedRequest, EmbedResponse, HealthStatus};

/// Shared by every worker for the life of the process.
pub struct EmbeddingService {
    model_id: String,
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingService {
    pub fn new(model_id: impl Into<String>, embedder: Arc<dyn Embedder>) -> Self {
        EmbeddingService {
            model_id: model_id.into(),
            embedder,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn healthz(&self) -> HealthStatus {
        HealthStatus::ok(&self.model_id)
    }

    /// Encodes the whole batch in one model call and returns unit-length
    /// vectors in input order. An empty batch never reaches the model.
    pub async fn embed(&self, request: EmbedRequest) -> Result<EmbedResponse, ServiceError> {
        let texts = request.texts;
        if texts.is_empty() {
            return Ok(EmbedResponse::default());
        }

        let expected = texts.len();
        let embedder = Arc::clone(&self.embedder);
        let mut embeddings = web::block(move || embedder.encode(&texts)).await??;

        if embeddings.len() != expected {
            return Err(ServiceError::CountMismatch {
                expected,
                got: embeddings.len(),
            });
        }
        let dim = embeddings[0].len();
        if let Some(other) = embeddings.iter().find(|v| v.len() != dim) {
            return Err(ServiceError::DimensionMismatch {
                expected: dim,
                got: other.len(),
            });
        }

        if let Some(index) = embeddings.iter_mut().position(|v| !l2_normalize(v)) {
            return Err(ServiceError::Degenerate { index });
        }
        debug!(batch = expected, dim, "encoded batch");

        Ok(EmbedResponse { embeddings })
    }
}
