use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct EmbedRequest {
    pub texts: Vec<String>,
}

/// One vector per input text, in input order.
#[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct EmbedResponse {
    pub embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    pub model: String,
}

impl HealthStatus {
    pub fn ok(model: &str) -> Self {
        HealthStatus {
            status: "ok".to_owned(),
            model: model.to_owned(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        ErrorBody {
            error: error.into(),
        }
    }
}
