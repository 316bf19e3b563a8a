//! Actix server startup + app wiring.
//!
//! Logs in to the recorder, builds one accessory per camera with stable ids,
//! then serves the HTTP surface until shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::dev::{Service, ServiceRequest, ServiceResponse};
use actix_web::{App, Error, HttpServer, web};
use anyhow::{Context as _, Result, anyhow};
use futures_util::future::{LocalBoxFuture, Ready, ok};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::accessory::{AccessoryRegistry, CameraAccessory};
use crate::api;
use crate::config;
use crate::events::EventBus;
use crate::identity::IdentityRegistry;
use crate::openapi;
use crate::recorder::{BlueirisClient, Recorder, RecorderCamera};
use crate::state::AppState;
use crate::stream_controller::{ControllerSettings, StreamController, SyncSources};
use crate::transcoder::{FfmpegLauncher, TranscoderLauncher};

/// Build server state and start the Actix HTTP server.
pub(crate) async fn run(args: crate::Args) -> Result<()> {
    let cfg = load_config(args.config.as_ref())?;
    let bind = match args.bind {
        Some(addr) => addr,
        None => config::bind_from_config(&cfg)?,
    };
    let data_dir = config::data_dir_from_config(&cfg)?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("create data dir {:?}", data_dir))?;
    let advertise_address = config::advertise_address_from_config(&cfg)?;
    let transcoder = config::transcoder_from_config(&cfg);
    let base_url = config::blueiris_base_url(&cfg.blueiris)?;
    tracing::info!(
        bind = %bind,
        data_dir = %data_dir.display(),
        blueiris = %base_url,
        transcoder = %transcoder.binary.display(),
        "starting hkbi"
    );

    let recorder = Arc::new(BlueirisClient::connect(base_url, &cfg.blueiris).await?);
    let cameras = streamable_cameras(
        recorder
            .list_cameras()
            .await
            .context("list blueiris cameras")?,
    );
    if cameras.is_empty() {
        return Err(anyhow!("blueiris reported no streamable cameras"));
    }

    let mut identities = IdentityRegistry::load_from_dir(&data_dir)?;
    let events = EventBus::new();
    let ssrc = SyncSources::generate();
    let launcher: Arc<dyn TranscoderLauncher> =
        Arc::new(FfmpegLauncher::new(transcoder.binary.clone()));
    let settings = ControllerSettings {
        packet_size: transcoder.packet_size,
        exit_timeout: transcoder.exit_timeout,
    };

    let mut registry = AccessoryRegistry::new();
    for camera in &cameras {
        let aid = identities.resolve(&camera.name);
        if let Some(existing) = registry.get(aid) {
            tracing::warn!(
                camera = %camera.id,
                name = %camera.name,
                duplicate_of = %existing.camera_id,
                "skipping camera with duplicate name"
            );
            continue;
        }
        let source = recorder.stream_source(&camera.id)?;
        let launcher = launcher.clone();
        registry.insert(CameraAccessory::new(
            aid,
            &camera.name,
            &camera.id,
            events.clone(),
            |surface| {
                StreamController::new(&camera.name, source, ssrc, settings, launcher, surface)
            },
        ));
        if !camera.is_online {
            tracing::warn!(camera = %camera.id, "camera is offline at startup");
        }
        tracing::info!(
            aid,
            camera = %camera.id,
            name = %camera.name,
            kind = camera.kind,
            audio = camera.has_audio,
            "camera accessory ready"
        );
    }
    tracing::debug!(
        known = identities.len(),
        new_cameras = identities.is_dirty(),
        "camera identities resolved"
    );
    identities.persist()?;

    let accessories = Arc::new(registry);
    let recorder: Arc<dyn Recorder> = recorder;
    let state = web::Data::new(AppState::new(
        accessories.clone(),
        recorder,
        events,
        advertise_address,
    ));
    tracing::info!(count = accessories.len(), "publishing accessories");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(api::json_config())
            .wrap(FilteredLogger)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", openapi::ApiDoc::openapi()),
            )
            .service(api::accessories_list)
            .service(api::accessory_get)
            .service(api::operating_mode_update)
            .service(api::stream_setup)
            .service(api::stream_control)
            .service(api::trigger_motion)
            .service(api::resource_fetch)
            .service(api::events_stream)
            .service(api::health_check)
    })
    .bind(bind)?
    .run()
    .await?;

    let stopped = accessories.shutdown().await;
    tracing::info!(stopped, "hkbi stopped");
    Ok(())
}

/// Drop recorder groups and system entries; they have no stream of their own.
fn streamable_cameras(cameras: Vec<RecorderCamera>) -> Vec<RecorderCamera> {
    cameras
        .into_iter()
        .filter(|camera| {
            if camera.is_streamable() {
                return true;
            }
            tracing::debug!(camera = %camera.id, name = %camera.name, "skipping group camera");
            false
        })
        .collect()
}

/// Return true when the request path should be logged.
fn should_log_path(path: &str) -> bool {
    !(path == "/events" || path == "/health" || path.starts_with("/swagger-ui/"))
}

/// Actix middleware that filters noisy paths from logging.
struct FilteredLogger;

impl<S, B> actix_web::dev::Transform<S, ServiceRequest> for FilteredLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = FilteredLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(FilteredLoggerMiddleware { service })
    }
}

/// Service wrapper that applies the logging filter.
struct FilteredLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for FilteredLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path().to_string();
        let should_log = should_log_path(&path);
        let method = req.method().clone();
        let peer = req.connection_info().realip_remote_addr().unwrap_or("-").to_string();
        let start = std::time::Instant::now();
        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            if should_log {
                tracing::info!(
                    method = %method,
                    path = %path,
                    status = %res.status().as_u16(),
                    peer = %peer,
                    elapsed_ms = %start.elapsed().as_millis(),
                    "http request"
                );
            }
            Ok(res)
        })
    }
}

/// Load server config from disk; without `--config`, look next to the binary.
fn load_config(path: Option<&PathBuf>) -> Result<config::ServerConfig> {
    if let Some(path) = path {
        return config::ServerConfig::load(path);
    }
    let auto_path = std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join("config.toml")));
    match auto_path {
        Some(path) if path.exists() => config::ServerConfig::load(&path),
        _ => Err(anyhow!("config file is required; use --config")),
    }
}
