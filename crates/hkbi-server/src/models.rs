//! API request/response models.
//!
//! Defines the JSON payloads served by the HTTP layer and OpenAPI docs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use hkbi_types::{SetupEndpointsResponse, StreamingStatus, SupportedRtpConfiguration};

use crate::accessory::{CameraAccessory, MANUFACTURER, OperatingMode};
use crate::session_store::SessionPhase;

/// One streaming session of an accessory.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionSummary {
    /// Hex session id.
    pub session_id: String,
    pub phase: SessionPhase,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessorySummary {
    pub aid: u64,
    pub name: String,
    /// Recorder short name.
    pub camera_id: String,
    pub manufacturer: String,
    pub streaming_status: StreamingStatus,
    pub supported_rtp_configuration: SupportedRtpConfiguration,
    /// Last published setup response, if any.
    pub setup_response: Option<SetupEndpointsResponse>,
    pub sessions: Vec<SessionSummary>,
    pub motion_detected: bool,
    pub operating_mode: OperatingMode,
}

impl AccessorySummary {
    pub fn from_accessory(accessory: &CameraAccessory) -> Self {
        let mut sessions: Vec<SessionSummary> = accessory
            .controller
            .sessions()
            .snapshot()
            .iter()
            .map(|session| SessionSummary {
                session_id: session.id().to_hex(),
                phase: session.phase_now(),
            })
            .collect();
        sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        Self {
            aid: accessory.aid,
            name: accessory.name.clone(),
            camera_id: accessory.camera_id.clone(),
            manufacturer: MANUFACTURER.to_string(),
            streaming_status: accessory.stream_management.streaming_status(),
            supported_rtp_configuration: accessory.stream_management.supported_rtp_configuration(),
            setup_response: accessory.stream_management.setup_response(),
            sessions,
            motion_detected: accessory.motion.detected(),
            operating_mode: accessory.operating_mode(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessoriesResponse {
    pub accessories: Vec<AccessorySummary>,
}

/// Query for forcing a motion sensor.
#[derive(Debug, Deserialize, IntoParams)]
pub struct TriggerQuery {
    /// Recorder short name of the camera.
    pub cam: String,
    /// `off` clears motion; anything else (or nothing) sets it.
    pub state: Option<String>,
}

impl TriggerQuery {
    pub fn detected(&self) -> bool {
        self.state.as_deref() != Some("off")
    }
}

/// Snapshot request as sent by controllers.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResourceRequest {
    #[serde(rename = "resource-type")]
    pub resource_type: String,
    pub aid: u64,
}

/// Filter for the event stream.
#[derive(Debug, Deserialize, IntoParams)]
pub struct EventsQuery {
    /// Only forward events for this accessory.
    pub aid: Option<u64>,
}
