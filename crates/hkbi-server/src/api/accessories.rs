//! Accessory listing and operating mode writes.

use actix_web::{HttpResponse, Responder, get, post, web};

use crate::accessory::{OperatingMode, OperatingModeUpdate};
use crate::api::ApiError;
use crate::models::{AccessoriesResponse, AccessorySummary};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/accessories",
    responses(
        (status = 200, description = "Camera accessories", body = AccessoriesResponse)
    )
)]
#[get("/accessories")]
pub async fn accessories_list(state: web::Data<AppState>) -> impl Responder {
    let accessories = state
        .accessories
        .list()
        .iter()
        .map(|accessory| AccessorySummary::from_accessory(accessory))
        .collect();
    HttpResponse::Ok().json(AccessoriesResponse { accessories })
}

#[utoipa::path(
    get,
    path = "/accessories/{aid}",
    params(
        ("aid" = u64, Path, description = "Accessory id")
    ),
    responses(
        (status = 200, description = "Camera accessory", body = AccessorySummary),
        (status = 404, description = "Unknown accessory")
    )
)]
#[get("/accessories/{aid}")]
pub async fn accessory_get(state: web::Data<AppState>, aid: web::Path<u64>) -> impl Responder {
    let aid = aid.into_inner();
    match state.accessories.get(aid) {
        Some(accessory) => HttpResponse::Ok().json(AccessorySummary::from_accessory(&accessory)),
        None => ApiError::NotFound(format!("unknown accessory {aid}")).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/accessories/{aid}/operating-mode",
    params(
        ("aid" = u64, Path, description = "Accessory id")
    ),
    request_body = OperatingModeUpdate,
    responses(
        (status = 200, description = "Updated operating mode", body = OperatingMode),
        (status = 404, description = "Unknown accessory")
    )
)]
#[post("/accessories/{aid}/operating-mode")]
/// Write camera operating mode characteristics.
pub async fn operating_mode_update(
    state: web::Data<AppState>,
    aid: web::Path<u64>,
    body: web::Json<OperatingModeUpdate>,
) -> impl Responder {
    let aid = aid.into_inner();
    let Some(accessory) = state.accessories.get(aid) else {
        return ApiError::NotFound(format!("unknown accessory {aid}")).into_response();
    };
    let mode = accessory.update_operating_mode(body.into_inner());
    tracing::info!(aid, ?mode, "operating mode updated");
    HttpResponse::Ok().json(mode)
}
