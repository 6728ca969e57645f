use actix_web::{
    web::{self, Data, Json, Path},
    HttpResponse, Scope,
};
use tracing::{error, info, warn};

use crate::{
    api::types::{EnrollRequest, EnrollResponse, ErrorResponse},
    core::{
        identity::types::SubjectId,
        imaging,
        services::enrollment::{EnrollError, EnrollmentService, EnrollmentSource},
    },
};

pub fn scope(max_request_size: usize) -> Scope {
    web::scope("/identities")
        .app_data(web::JsonConfig::default().limit(max_request_size))
        .service(
            web::resource("/{id}/descriptor")
                .route(web::put().to(enroll_descriptor))
        )
        .service(
            web::resource("/{id}/audit")
                .route(web::get().to(list_audit_records))
        )
}

fn error_response(err: &EnrollError) -> HttpResponse {
    let body = ErrorResponse { error: err.to_string() };
    match err {
        EnrollError::InvalidInput(_) | EnrollError::BadImage(_) => HttpResponse::BadRequest().json(body),
        EnrollError::NoFace => HttpResponse::UnprocessableEntity().json(body),
        EnrollError::Unready => HttpResponse::ServiceUnavailable().json(body),
        EnrollError::Provider(_) | EnrollError::Store(_) => {
            HttpResponse::InternalServerError().json(ErrorResponse { error: "server error".into() })
        }
    }
}

async fn enroll_descriptor(
    service: Data<EnrollmentService>,
    id: Path<String>,
    request: Json<EnrollRequest>,
) -> HttpResponse {
    let subject_id = SubjectId::from(id.into_inner());
    info!(subject = %subject_id, "Received enrollment request");

    let request = request.into_inner();
    let source = match (request.descriptor, request.image) {
        (Some(descriptor), None) => EnrollmentSource::Descriptor(descriptor),
        (None, Some(image)) => match imaging::decode_data_url(Some(&image)) {
            Ok(bytes) => EnrollmentSource::Image(bytes),
            Err(e) => return error_response(&EnrollError::BadImage(e)),
        },
        _ => {
            return error_response(&EnrollError::InvalidInput(
                "exactly one of descriptor or image is required".into(),
            ))
        }
    };

    match service.enroll(subject_id.clone(), source).await {
        Ok(identity) => HttpResponse::Ok().json(EnrollResponse::from(&identity)),
        Err(e) => {
            match &e {
                EnrollError::Provider(_) | EnrollError::Store(_) => {
                    error!(subject = %subject_id, "Enrollment failed: {}", e)
                }
                _ => warn!(subject = %subject_id, "Enrollment rejected: {}", e),
            }
            error_response(&e)
        }
    }
}

async fn list_audit_records(
    service: Data<EnrollmentService>,
    id: Path<String>,
) -> HttpResponse {
    let subject_id = SubjectId::from(id.into_inner());

    match service.audit_history(&subject_id).await {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => {
            error!(subject = %subject_id, "Failed to list audit records: {}", e);
            error_response(&e)
        }
    }
}
