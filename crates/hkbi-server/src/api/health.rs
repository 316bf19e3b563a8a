use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub accessories: usize,
}

/// Basic health check.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Bridge is healthy", body = HealthResponse)
    )
)]
#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        accessories: state.accessories.len(),
    })
}
