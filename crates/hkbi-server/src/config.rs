//! Configuration loading and parsing.
//!
//! Defines the bridge config schema and resolves defaults. Keys are kebab-case.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::Deserialize;

const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:51826";
const DEFAULT_TRANSCODER_BINARY: &str = "ffmpeg";
/// RTP packet size accepted by HomeKit controllers.
pub const DEFAULT_PACKET_SIZE: u32 = 1378;

/// Top-level bridge configuration loaded from TOML.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    /// Bind address (host:port) for the HTTP surface.
    pub listen_address: Option<String>,
    /// Directory for persisted state (camera identities).
    pub data_dir: String,
    /// Address advertised to controllers in setup responses.
    pub advertise_address: Option<String>,
    /// Blue Iris connection settings.
    pub blueiris: BlueirisConfig,
    /// Transcoder process settings.
    pub transcoder: Option<TranscoderConfig>,
}

/// Blue Iris instance and credentials.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct BlueirisConfig {
    /// Base URL of the Blue Iris web server, e.g. `http://blueiris.lan:81`.
    pub instance: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct TranscoderConfig {
    /// ffmpeg binary name or path.
    pub binary: Option<String>,
    /// RTP packet size handed to the muxer.
    pub packet_size: Option<u32>,
    /// Bound on the wait after interrupting a transcoder; unset waits forever.
    pub exit_timeout_ms: Option<u64>,
}

/// Resolved transcoder settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscoderSettings {
    pub binary: PathBuf,
    pub packet_size: u32,
    pub exit_timeout: Option<Duration>,
}

impl Default for TranscoderSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_TRANSCODER_BINARY),
            packet_size: DEFAULT_PACKET_SIZE,
            exit_timeout: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        Self::parse(&raw).with_context(|| format!("parse config {:?}", path))
    }

    fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str::<ServerConfig>(raw)?)
    }
}

/// Parse the bind address from config, falling back to the HomeKit default port.
pub fn bind_from_config(cfg: &ServerConfig) -> Result<SocketAddr> {
    let bind = cfg
        .listen_address
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_LISTEN_ADDRESS);
    bind.parse()
        .with_context(|| format!("parse listen-address {bind}"))
}

/// Extract the data directory from config.
pub fn data_dir_from_config(cfg: &ServerConfig) -> Result<PathBuf> {
    let dir = cfg.data_dir.trim();
    if dir.is_empty() {
        return Err(anyhow::anyhow!("data-dir is required in config"));
    }
    Ok(PathBuf::from(dir))
}

/// Parse the optional advertised accessory address.
pub fn advertise_address_from_config(cfg: &ServerConfig) -> Result<Option<IpAddr>> {
    let Some(raw) = cfg.advertise_address.as_deref().map(str::trim) else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    let addr = raw
        .parse()
        .with_context(|| format!("parse advertise-address {raw}"))?;
    Ok(Some(addr))
}

/// Parse and validate the Blue Iris base URL.
pub fn blueiris_base_url(cfg: &BlueirisConfig) -> Result<Url> {
    let url = Url::parse(cfg.instance.trim())
        .with_context(|| format!("parse blueiris instance {}", cfg.instance))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(anyhow::anyhow!(
                "blueiris instance must use http or https, got {other}"
            ));
        }
    }
    if url.host_str().is_none() {
        return Err(anyhow::anyhow!("blueiris instance requires a host"));
    }
    Ok(url)
}

/// Resolve transcoder settings and their defaults.
pub fn transcoder_from_config(cfg: &ServerConfig) -> TranscoderSettings {
    let defaults = TranscoderSettings::default();
    let Some(section) = cfg.transcoder.as_ref() else {
        return defaults;
    };
    TranscoderSettings {
        binary: section
            .binary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.binary),
        packet_size: section.packet_size.unwrap_or(defaults.packet_size),
        exit_timeout: section.exit_timeout_ms.map(Duration::from_millis),
    }
}
