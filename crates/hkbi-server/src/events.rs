//! In-process event bus for accessory updates.
//!
//! Published characteristic values fan out to subscribed protocol clients.

use serde::Serialize;
use tokio::sync::broadcast;
use utoipa::ToSchema;

use hkbi_types::{SetupEndpointsResponse, StreamingStatus};

use crate::accessory::OperatingMode;

/// Characteristic updates published by accessories.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BridgeEvent {
    StreamingStatus {
        aid: u64,
        status: StreamingStatus,
    },
    SetupResponse {
        aid: u64,
        response: SetupEndpointsResponse,
    },
    Motion {
        aid: u64,
        detected: bool,
    },
    OperatingMode {
        aid: u64,
        mode: OperatingMode,
    },
}

impl BridgeEvent {
    pub fn aid(&self) -> u64 {
        match self {
            BridgeEvent::StreamingStatus { aid, .. }
            | BridgeEvent::SetupResponse { aid, .. }
            | BridgeEvent::Motion { aid, .. }
            | BridgeEvent::OperatingMode { aid, .. } => *aid,
        }
    }

    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::StreamingStatus { .. } => "streaming_status",
            BridgeEvent::SetupResponse { .. } => "setup_response",
            BridgeEvent::Motion { .. } => "motion",
            BridgeEvent::OperatingMode { .. } => "operating_mode",
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    /// Create a new event bus with a bounded broadcast channel.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.sender.subscribe()
    }

    /// Publish an update; dropped silently when nobody listens.
    pub fn publish(&self, event: BridgeEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
