//! Stream management endpoints: setup and selected stream configuration writes.

use std::net::{IpAddr, SocketAddr};

use actix_web::{HttpRequest, HttpResponse, Responder, post, web};

use hkbi_types::{SetupEndpoints, SetupEndpointsResponse, StreamConfiguration};

use crate::api::ApiError;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/accessories/{aid}/stream/setup",
    params(
        ("aid" = u64, Path, description = "Accessory id")
    ),
    request_body = SetupEndpoints,
    responses(
        (status = 200, description = "Setup response", body = SetupEndpointsResponse),
        (status = 400, description = "Accessory address unknown"),
        (status = 404, description = "Unknown accessory")
    )
)]
#[post("/accessories/{aid}/stream/setup")]
/// Negotiate stream endpoints for a new session.
pub async fn stream_setup(
    state: web::Data<AppState>,
    req: HttpRequest,
    aid: web::Path<u64>,
    body: web::Json<SetupEndpoints>,
) -> impl Responder {
    let aid = aid.into_inner();
    let Some(accessory) = state.accessories.get(aid) else {
        return ApiError::NotFound(format!("unknown accessory {aid}")).into_response();
    };
    let accessory_ip = match accessory_address(&state, &req) {
        Ok(ip) => ip,
        Err(err) => return err.into_response(),
    };
    let response = accessory
        .controller
        .setup(body.into_inner(), accessory_ip)
        .await;
    HttpResponse::Ok().json(response)
}

#[utoipa::path(
    post,
    path = "/accessories/{aid}/stream/control",
    params(
        ("aid" = u64, Path, description = "Accessory id")
    ),
    request_body = StreamConfiguration,
    responses(
        (status = 204, description = "Command accepted"),
        (status = 404, description = "Unknown accessory")
    )
)]
#[post("/accessories/{aid}/stream/control")]
/// Apply a session command (start, end, suspend, resume, reconfigure).
pub async fn stream_control(
    state: web::Data<AppState>,
    aid: web::Path<u64>,
    body: web::Json<StreamConfiguration>,
) -> impl Responder {
    let aid = aid.into_inner();
    let Some(accessory) = state.accessories.get(aid) else {
        return ApiError::NotFound(format!("unknown accessory {aid}")).into_response();
    };
    let config = body.into_inner();
    let outcome = accessory.controller.dispatch(&config).await;
    tracing::debug!(
        aid,
        session_id = %config.command.identifier,
        command = ?config.command.kind(),
        ?outcome,
        "stream control"
    );
    HttpResponse::NoContent().finish()
}

/// Address the controller should send RTCP to and expect RTP from: the
/// configured one, else the address the request arrived on.
fn accessory_address(state: &AppState, req: &HttpRequest) -> Result<IpAddr, ApiError> {
    if let Some(ip) = state.advertise_address {
        return Ok(ip);
    }
    let local = req.app_config().local_addr().ip();
    if !local.is_unspecified() {
        return Ok(local);
    }
    let host = req.connection_info().host().to_string();
    host_ip(&host).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "cannot derive accessory address from host {host}; set advertise-address"
        ))
    })
}

fn host_ip(host: &str) -> Option<IpAddr> {
    if let Ok(addr) = host.parse::<SocketAddr>() {
        return Some(addr.ip());
    }
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .ok()
}
