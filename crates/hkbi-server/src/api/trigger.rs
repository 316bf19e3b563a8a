//! Motion trigger endpoint, typically hit by recorder alert actions.

use actix_web::{HttpResponse, Responder, get, web};

use crate::api::ApiError;
use crate::models::TriggerQuery;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/trigger",
    params(TriggerQuery),
    responses(
        (status = 200, description = "Motion sensor updated"),
        (status = 400, description = "Unknown camera")
    )
)]
#[get("/trigger")]
/// Set or clear a camera's motion sensor.
pub async fn trigger_motion(
    state: web::Data<AppState>,
    query: web::Query<TriggerQuery>,
) -> impl Responder {
    let Some(accessory) = state.accessories.by_camera_id(&query.cam) else {
        tracing::info!(camera = %query.cam, "trigger request for unknown camera");
        return ApiError::BadRequest(format!("unknown camera {}", query.cam)).into_response();
    };
    let detected = query.detected();
    accessory.motion.set_detected(detected);
    tracing::debug!(camera = %query.cam, aid = accessory.aid, detected, "motion trigger");
    HttpResponse::Ok().finish()
}
