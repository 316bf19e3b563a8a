use utoipa::OpenApi;

use crate::accessory;
use crate::api;
use crate::events;
use crate::models;
use crate::session_store;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::accessories::accessories_list,
        api::accessories::accessory_get,
        api::accessories::operating_mode_update,
        api::stream_management::stream_setup,
        api::stream_management::stream_control,
        api::trigger::trigger_motion,
        api::resource::resource_fetch,
        api::streams::events_stream,
        api::health::health_check,
    ),
    components(
        schemas(
            models::AccessoriesResponse,
            models::AccessorySummary,
            models::SessionSummary,
            models::ResourceRequest,
            session_store::SessionPhase,
            accessory::OperatingMode,
            accessory::OperatingModeUpdate,
            events::BridgeEvent,
            api::health::HealthResponse,
            hkbi_types::SetupEndpoints,
            hkbi_types::SetupEndpointsResponse,
            hkbi_types::StreamConfiguration,
            hkbi_types::StreamingStatus,
        )
    ),
    tags(
        (name = "hkbi", description = "Recorder camera bridge API")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_stream_management_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/accessories/{aid}/stream/setup"));
        assert!(doc.paths.paths.contains_key("/accessories/{aid}/stream/control"));
        assert!(doc.paths.paths.contains_key("/resource"));
    }
}
