use actix_web::{web::{self, Data}, HttpResponse, Resource};

use crate::core::services::health::HealthService;

pub fn resource() -> Resource {
    web::resource("/health").route(web::get().to(health))
}

async fn health(service: Data<HealthService>) -> HttpResponse {
    HttpResponse::Ok().json(service.report())
}
