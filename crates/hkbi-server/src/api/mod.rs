//! HTTP API handlers.
//!
//! Defines the Actix routes through which controllers reach the camera
//! accessories: stream management, snapshots, motion triggers and events.

pub mod accessories;
pub mod health;
pub mod resource;
pub mod stream_management;
pub mod streams;
pub mod trigger;

use actix_web::error::InternalError;
use actix_web::{HttpResponse, web};

pub use accessories::{accessories_list, accessory_get, operating_mode_update};
pub use health::health_check;
pub use resource::resource_fetch;
pub use stream_management::{stream_control, stream_setup};
pub use streams::events_stream;
pub use trigger::trigger_motion;

/// Handler failures mapped onto status codes.
#[derive(Debug)]
pub enum ApiError {
    /// The request is malformed or references something that cannot be served.
    BadRequest(String),
    /// No accessory with the requested id.
    NotFound(String),
    /// The recorder or another collaborator failed.
    Internal(String),
}

impl ApiError {
    pub fn into_response(self) -> HttpResponse {
        match self {
            ApiError::BadRequest(msg) => HttpResponse::BadRequest().body(msg),
            ApiError::NotFound(msg) => HttpResponse::NotFound().body(msg),
            ApiError::Internal(msg) => HttpResponse::InternalServerError().body(msg),
        }
    }
}

/// JSON extractor config that logs rejected bodies.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        tracing::warn!(path = %req.path(), error = %err, "rejected malformed request body");
        let response = HttpResponse::BadRequest().body(err.to_string());
        InternalError::from_response(err, response).into()
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use bytes::Bytes;
    use reqwest::Url;

    use crate::accessory::AccessoryRegistry;
    use crate::events::EventBus;
    use crate::recorder::{Recorder, RecorderCamera, SnapshotStream};
    use crate::state::AppState;

    /// Recorder serving canned snapshots.
    pub(crate) struct MockRecorder {
        pub snapshots: HashMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl Recorder for MockRecorder {
        async fn list_cameras(&self) -> Result<Vec<RecorderCamera>> {
            Ok(Vec::new())
        }

        async fn fetch_snapshot(&self, camera_id: &str) -> Result<SnapshotStream> {
            let Some(image) = self.snapshots.get(camera_id) else {
                return Err(anyhow!("snapshot for {camera_id} failed with status 404"));
            };
            let chunks: Vec<Result<Bytes, std::io::Error>> = image
                .chunks(4)
                .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
                .collect();
            Ok(Box::pin(futures_util::stream::iter(chunks)))
        }

        fn stream_source(&self, camera_id: &str) -> Result<Url> {
            Ok(Url::parse(&format!("rtsp://u:p@blueiris.lan:81/{camera_id}"))?)
        }
    }

    /// State with a Porch (aid 0, `porch`) and a Garage (aid 2, `garage`) camera.
    pub(crate) fn make_state() -> actix_web::web::Data<AppState> {
        let events = EventBus::new();
        let mut registry = AccessoryRegistry::new();
        registry.insert(crate::accessory::tests::accessory(0, "Porch", "porch", &events));
        registry.insert(crate::accessory::tests::accessory(2, "Garage", "garage", &events));

        let mut snapshots = HashMap::new();
        snapshots.insert("porch".to_string(), vec![0xff, 0xd8, 0xff, 0xe0, 1, 2, 3, 0xff, 0xd9]);
        let recorder = Arc::new(MockRecorder { snapshots });

        actix_web::web::Data::new(AppState::new(
            Arc::new(registry),
            recorder,
            events,
            Some("192.168.1.5".parse().unwrap()),
        ))
    }
}
