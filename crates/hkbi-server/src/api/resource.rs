//! Snapshot resource endpoint.

use actix_web::http::header;
use actix_web::{HttpResponse, Responder, post, web};

use crate::api::ApiError;
use crate::models::ResourceRequest;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/resource",
    request_body = ResourceRequest,
    responses(
        (status = 200, description = "JPEG snapshot", content_type = "image/jpeg"),
        (status = 400, description = "Unknown accessory"),
        (status = 500, description = "Unsupported resource type or recorder failure")
    )
)]
#[post("/resource")]
/// Proxy a camera snapshot from the recorder.
pub async fn resource_fetch(
    state: web::Data<AppState>,
    body: web::Json<ResourceRequest>,
) -> impl Responder {
    let request = body.into_inner();
    let Some(accessory) = state.accessories.get(request.aid) else {
        tracing::info!(aid = request.aid, "snapshot requested for unknown accessory");
        return ApiError::BadRequest(format!("unknown accessory {}", request.aid)).into_response();
    };
    if request.resource_type != "image" {
        tracing::info!(resource_type = %request.resource_type, "unsupported resource request");
        return ApiError::Internal(format!(
            "unsupported resource type {}",
            request.resource_type
        ))
        .into_response();
    }

    match state.recorder.fetch_snapshot(&accessory.camera_id).await {
        Ok(stream) => HttpResponse::Ok()
            .insert_header((header::CONTENT_TYPE, "image/jpeg"))
            .streaming(stream),
        Err(err) => {
            tracing::warn!(camera = %accessory.camera_id, error = %err, "snapshot fetch failed");
            ApiError::Internal(err.to_string()).into_response()
        }
    }
}
