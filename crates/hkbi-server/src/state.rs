//! Shared application state.
//!
//! Holds the accessory registry, the recorder client and the event bus.

use std::net::IpAddr;
use std::sync::Arc;

use crate::accessory::AccessoryRegistry;
use crate::events::EventBus;
use crate::recorder::Recorder;

pub struct AppState {
    pub accessories: Arc<AccessoryRegistry>,
    pub recorder: Arc<dyn Recorder>,
    pub events: EventBus,
    /// Address put into setup responses; derived per request when unset.
    pub advertise_address: Option<IpAddr>,
}

impl AppState {
    pub fn new(
        accessories: Arc<AccessoryRegistry>,
        recorder: Arc<dyn Recorder>,
        events: EventBus,
        advertise_address: Option<IpAddr>,
    ) -> Self {
        Self {
            accessories,
            recorder,
            events,
            advertise_address,
        }
    }
}
