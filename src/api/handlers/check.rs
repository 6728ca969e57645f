// src/api/handlers/check.rs
use actix_web::{
    error::{InternalError, JsonPayloadError},
    web::{self, Data, Json},
    HttpResponse,
};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::{
    api::types::{CheckRequest, CheckResponse},
    core::{
        identity::types::{ChallengeId, SubjectId},
        services::verification::VerificationService,
    },
    utils::metrics::Metrics,
};

/// `POST /check`. Every business outcome, including malformed bodies, is
/// answered with 200 and a status in the payload.
pub fn configure(cfg: &mut web::ServiceConfig, max_request_size: usize) {
    cfg.service(
        web::resource("/check")
            .app_data(json_config(max_request_size))
            .route(web::post().to(check)),
    );
}

fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            let message = match &err {
                JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
                    "request body too large"
                }
                _ => "invalid request body",
            };
            warn!("Rejected check request body: {}", err);
            let response = HttpResponse::Ok().json(CheckResponse::error(message));
            InternalError::from_response(err, response).into()
        })
}

async fn check(
    service: Data<VerificationService>,
    metrics: Data<Metrics>,
    request: Json<CheckRequest>,
) -> HttpResponse {
    let started = Instant::now();
    let request = request.into_inner();

    let subject_id = SubjectId::from(request.user_id.unwrap_or_default());
    let challenge_id = ChallengeId::from(request.challenge_id.unwrap_or_default());
    info!(subject = %subject_id, challenge = %challenge_id, "Received face check");

    let outcome = service
        .verify_data_url(&subject_id, &challenge_id, request.image.as_deref())
        .await;

    metrics.record_check(&outcome, started.elapsed());
    info!(
        subject = %subject_id,
        challenge = %challenge_id,
        status = outcome.status(),
        "Face check complete"
    );

    HttpResponse::Ok().json(CheckResponse::from(&outcome))
}
