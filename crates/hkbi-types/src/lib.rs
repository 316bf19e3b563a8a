//! Wire types for camera stream management.
//!
//! These mirror the values a HomeKit controller exchanges with a camera's RTP stream
//! management service, decoded into plain structs. The accessory-protocol encoding
//! itself lives in the transport, not here.

use std::fmt;
use std::net::IpAddr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque identifier the controller assigns to one streaming attempt.
///
/// Serialized and displayed as lowercase hex.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SessionId(Vec<u8>);

impl SessionId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for SessionId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode(s.trim()).map(Self)
    }
}

impl Serialize for SessionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }
}

/// Address and RTP ports of one side of a stream.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StreamAddress {
    pub ip_version: IpVersion,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub ip_addr: IpAddr,
    pub video_rtp_port: u16,
    pub audio_rtp_port: u16,
}

/// SRTP protection profile negotiated during setup.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum CryptoSuite {
    #[default]
    AesCm128HmacSha1_80,
    AesCm256HmacSha1_80,
    None,
}

impl CryptoSuite {
    /// Suite name as understood by ffmpeg's `-srtp_out_suite`.
    pub fn srtp_suite_name(&self) -> Option<&'static str> {
        match self {
            CryptoSuite::AesCm128HmacSha1_80 => Some("AES_CM_128_HMAC_SHA1_80"),
            CryptoSuite::AesCm256HmacSha1_80 => Some("AES_CM_256_HMAC_SHA1_80"),
            CryptoSuite::None => None,
        }
    }
}

/// Per-stream SRTP key material supplied by the controller.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SrtpParameters {
    pub crypto_suite: CryptoSuite,
    pub master_key: Vec<u8>,
    pub master_salt: Vec<u8>,
}

impl SrtpParameters {
    /// Base64 of the master key followed by the master salt.
    pub fn srtp_key(&self) -> String {
        let mut material = Vec::with_capacity(self.master_key.len() + self.master_salt.len());
        material.extend_from_slice(&self.master_key);
        material.extend_from_slice(&self.master_salt);
        STANDARD.encode(material)
    }
}

/// Setup request sent by the controller before a stream starts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SetupEndpoints {
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub session_id: SessionId,
    pub controller_addr: StreamAddress,
    pub video: SrtpParameters,
    pub audio: SrtpParameters,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum SetupStatus {
    Success,
    Busy,
    Error,
}

/// Accessory's answer to [`SetupEndpoints`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SetupEndpointsResponse {
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub session_id: SessionId,
    pub status: SetupStatus,
    pub accessory_addr: StreamAddress,
    pub video: SrtpParameters,
    pub audio: SrtpParameters,
    pub ssrc_video: i32,
    pub ssrc_audio: i32,
}

/// Session control command codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    End,
    Start,
    Suspend,
    Resume,
    Reconfigure,
    Unknown(u8),
}

impl From<u8> for SessionCommand {
    fn from(code: u8) -> Self {
        match code {
            0 => SessionCommand::End,
            1 => SessionCommand::Start,
            2 => SessionCommand::Suspend,
            3 => SessionCommand::Resume,
            4 => SessionCommand::Reconfigure,
            other => SessionCommand::Unknown(other),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SessionControl {
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub identifier: SessionId,
    /// Raw command code, see [`SessionCommand`].
    pub command: u8,
}

impl SessionControl {
    pub fn kind(&self) -> SessionCommand {
        SessionCommand::from(self.command)
    }
}

/// RTP parameters selected by the controller for the video stream.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RtpParameters {
    pub payload_type: u8,
    #[serde(default)]
    pub max_bitrate: Option<u16>,
    #[serde(default)]
    pub min_rtcp_interval: Option<f32>,
    #[serde(default)]
    pub max_mtu: Option<u16>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct VideoParameters {
    pub rtp: RtpParameters,
}

/// Selected stream configuration write: a session command plus, for starts, the
/// negotiated video parameters.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StreamConfiguration {
    pub command: SessionControl,
    #[serde(default)]
    pub video: Option<VideoParameters>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum StreamingStatus {
    #[default]
    Available,
    InUse,
    Unavailable,
}

/// Transport configuration advertised by the accessory.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SupportedRtpConfiguration {
    pub crypto_suite: CryptoSuite,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_serializes_as_hex() {
        let id = SessionId::new(vec![0xde, 0xad, 0xbe, 0xef]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"deadbeef\"");
        let back: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn session_id_rejects_invalid_hex() {
        assert!(serde_json::from_str::<SessionId>("\"not-hex\"").is_err());
    }

    #[test]
    fn srtp_key_concatenates_key_and_salt() {
        let params = SrtpParameters {
            crypto_suite: CryptoSuite::AesCm128HmacSha1_80,
            master_key: vec![1, 2, 3],
            master_salt: vec![4, 5, 6],
        };
        assert_eq!(params.srtp_key(), STANDARD.encode([1, 2, 3, 4, 5, 6]));
    }

    #[test]
    fn command_codes_decode() {
        assert_eq!(SessionCommand::from(1), SessionCommand::Start);
        assert_eq!(SessionCommand::from(0), SessionCommand::End);
        assert_eq!(SessionCommand::from(9), SessionCommand::Unknown(9));
    }

    #[test]
    fn stream_configuration_without_video_parses() {
        let raw = r#"{"command":{"identifier":"0102","command":0}}"#;
        let cfg: StreamConfiguration = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.command.kind(), SessionCommand::End);
        assert!(cfg.video.is_none());
    }
}
