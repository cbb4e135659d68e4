use actix_web::{get, web, HttpResponse, Responder};

use crate::{config::SiteConfig, observability::HealthStatus, types::StatusMessage, RqDbPool};

/// Health check endpoint for load balancers
#[get("")]
pub async fn health_check(pool: RqDbPool, site: web::Data<SiteConfig>) -> impl Responder {
    let status = HealthStatus::check(&pool, &site.dataset_dir);
    if status.is_healthy() {
        HttpResponse::Ok().json(status)
    } else {
        HttpResponse::ServiceUnavailable().json(status)
    }
}

/// Readiness check, the store must hand out connections
#[get("/ready")]
pub async fn readiness_check(pool: RqDbPool) -> impl Responder {
    match pool.get() {
        Ok(_) => HttpResponse::Ok().json(StatusMessage {
            status: "ready",
            database: Some("connected"),
            dataset_dir: None,
            version: None,
        }),
        Err(_) => HttpResponse::ServiceUnavailable().json(StatusMessage {
            status: "not_ready",
            database: Some("disconnected"),
            dataset_dir: None,
            version: None,
        }),
    }
}

/// Liveness check - simple check to see if the app is alive
#[get("/live")]
pub async fn liveness_check() -> impl Responder {
    HttpResponse::Ok().json(StatusMessage {
        status: "alive",
        database: None,
        dataset_dir: None,
        version: Some(env!("CARGO_PKG_VERSION")),
    })
}

pub fn routes() -> actix_web::Scope {
    web::scope("/health")
        .service(health_check)
        .service(readiness_check)
        .service(liveness_check)
}
