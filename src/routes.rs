use actix_web::{
    error::{InternalError, JsonPayloadError},
    get,
    http::StatusCode,
    post,
    web::{self},
    HttpRequest, HttpResponse, ResponseError,
};
use tracing::{error, warn};

use crate::app::EmbeddingService;
use crate::error::ServiceError;
use crate::model::{EmbedRequest, EmbedResponse, ErrorBody, HealthStatus};

pub fn configure(cfg: &mut web::ServiceConfig, max_payload_bytes: usize) {
    cfg.app_data(json_config(max_payload_bytes))
        .service(healthz)
        .service(embed);
}

/// Body-shape failures are the caller's fault: 413 when the body is too
/// large, 400 for everything else.
fn json_config(max_payload_bytes: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(max_payload_bytes)
        .error_handler(json_error)
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let status = match err.status_code() {
        StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    };
    warn!(%status, error = %err, "rejected embed request");
    let response = HttpResponse::build(status).json(ErrorBody::new(err.to_string()));
    InternalError::from_response(err, response).into()
}

#[get("/healthz")]
async fn healthz(service: web::Data<EmbeddingService>) -> web::Json<HealthStatus> {
    web::Json(service.healthz())
}

#[post("/embed")]
async fn embed(
    service: web::Data<EmbeddingService>,
    request: web::Json<EmbedRequest>,
) -> Result<web::Json<EmbedResponse>, ServiceError> {
    let response = service.embed(request.into_inner()).await.map_err(|err| {
        error!(error = %err, "embedding failed");
        err
    })?;
    Ok(web::Json(response))
}
