//! Camera accessories exposed to controllers.
//!
//! Each recorder camera becomes one accessory with a stream management service
//! (driven by its [`StreamController`]), a motion sensor and the camera operating
//! mode flags.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use hkbi_types::{SetupEndpointsResponse, StreamingStatus, SupportedRtpConfiguration};

use crate::events::{BridgeEvent, EventBus};
use crate::stream_controller::StreamController;

pub const MANUFACTURER: &str = "HKBI";

/// Where the controller publishes encoded status back to protocol clients.
pub trait AccessorySurface: Send + Sync {
    fn publish_setup_response(&self, response: &SetupEndpointsResponse);
    fn publish_streaming_status(&self, status: StreamingStatus);
}

#[derive(Default)]
struct ManagementValues {
    setup_response: Option<SetupEndpointsResponse>,
    streaming_status: StreamingStatus,
}

/// RTP stream management service of one camera.
pub struct StreamManagement {
    aid: u64,
    events: EventBus,
    values: Mutex<ManagementValues>,
}

impl StreamManagement {
    pub fn new(aid: u64, events: EventBus) -> Self {
        Self {
            aid,
            events,
            values: Mutex::new(ManagementValues::default()),
        }
    }

    pub fn streaming_status(&self) -> StreamingStatus {
        self.values
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .streaming_status
    }

    pub fn setup_response(&self) -> Option<SetupEndpointsResponse> {
        self.values
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .setup_response
            .clone()
    }

    pub fn supported_rtp_configuration(&self) -> SupportedRtpConfiguration {
        SupportedRtpConfiguration::default()
    }
}

impl AccessorySurface for StreamManagement {
    fn publish_setup_response(&self, response: &SetupEndpointsResponse) {
        self.values
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .setup_response = Some(response.clone());
        self.events.publish(BridgeEvent::SetupResponse {
            aid: self.aid,
            response: response.clone(),
        });
    }

    fn publish_streaming_status(&self, status: StreamingStatus) {
        self.values
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .streaming_status = status;
        self.events.publish(BridgeEvent::StreamingStatus {
            aid: self.aid,
            status,
        });
    }
}

pub struct MotionSensor {
    aid: u64,
    detected: AtomicBool,
    events: EventBus,
}

impl MotionSensor {
    pub fn new(aid: u64, events: EventBus) -> Self {
        Self {
            aid,
            detected: AtomicBool::new(false),
            events,
        }
    }

    pub fn detected(&self) -> bool {
        self.detected.load(Ordering::SeqCst)
    }

    pub fn set_detected(&self, detected: bool) {
        self.detected.store(detected, Ordering::SeqCst);
        self.events.publish(BridgeEvent::Motion {
            aid: self.aid,
            detected,
        });
    }
}

/// Camera operating mode characteristics. All default to off.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OperatingMode {
    pub event_snapshots_active: bool,
    pub homekit_camera_active: bool,
    pub periodic_snapshots_active: bool,
}

/// Partial write of [`OperatingMode`]; absent fields keep their value.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct OperatingModeUpdate {
    pub event_snapshots_active: Option<bool>,
    pub homekit_camera_active: Option<bool>,
    pub periodic_snapshots_active: Option<bool>,
}

impl OperatingMode {
    fn apply(&mut self, update: OperatingModeUpdate) {
        if let Some(value) = update.event_snapshots_active {
            self.event_snapshots_active = value;
        }
        if let Some(value) = update.homekit_camera_active {
            self.homekit_camera_active = value;
        }
        if let Some(value) = update.periodic_snapshots_active {
            self.periodic_snapshots_active = value;
        }
    }
}

pub struct CameraAccessory {
    pub aid: u64,
    /// Display name, also the key in the identity registry.
    pub name: String,
    /// Recorder short name used for snapshot and stream urls.
    pub camera_id: String,
    pub controller: StreamController,
    pub stream_management: Arc<StreamManagement>,
    pub motion: MotionSensor,
    operating_mode: Mutex<OperatingMode>,
    events: EventBus,
}

impl CameraAccessory {
    /// `build_controller` receives the stream management service it must publish to.
    pub fn new(
        aid: u64,
        name: impl Into<String>,
        camera_id: impl Into<String>,
        events: EventBus,
        build_controller: impl FnOnce(Arc<StreamManagement>) -> StreamController,
    ) -> Self {
        let stream_management = Arc::new(StreamManagement::new(aid, events.clone()));
        let controller = build_controller(stream_management.clone());
        Self {
            aid,
            name: name.into(),
            camera_id: camera_id.into(),
            controller,
            stream_management,
            motion: MotionSensor::new(aid, events.clone()),
            operating_mode: Mutex::new(OperatingMode::default()),
            events,
        }
    }

    pub fn operating_mode(&self) -> OperatingMode {
        *self
            .operating_mode
            .lock()
            .unwrap_or_else(|err| err.into_inner())
    }

    pub fn update_operating_mode(&self, update: OperatingModeUpdate) -> OperatingMode {
        let mode = {
            let mut mode = self
                .operating_mode
                .lock()
                .unwrap_or_else(|err| err.into_inner());
            mode.apply(update);
            *mode
        };
        self.events.publish(BridgeEvent::OperatingMode {
            aid: self.aid,
            mode,
        });
        mode
    }
}

/// All accessories, keyed by stable id.
#[derive(Default)]
pub struct AccessoryRegistry {
    by_aid: BTreeMap<u64, Arc<CameraAccessory>>,
}

impl AccessoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, accessory: CameraAccessory) {
        self.by_aid.insert(accessory.aid, Arc::new(accessory));
    }

    pub fn get(&self, aid: u64) -> Option<Arc<CameraAccessory>> {
        self.by_aid.get(&aid).cloned()
    }

    /// Look up by recorder short name.
    pub fn by_camera_id(&self, camera_id: &str) -> Option<Arc<CameraAccessory>> {
        self.by_aid
            .values()
            .find(|accessory| accessory.camera_id == camera_id)
            .cloned()
    }

    pub fn list(&self) -> Vec<Arc<CameraAccessory>> {
        self.by_aid.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_aid.len()
    }

    /// End every running stream of every camera.
    pub async fn shutdown(&self) -> usize {
        let mut stopped = 0;
        for accessory in self.by_aid.values() {
            stopped += accessory.controller.shutdown().await;
        }
        stopped
    }
}
