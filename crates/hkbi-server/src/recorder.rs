//! Recorder (Blue Iris) client.
//!
//! Talks to the Blue Iris JSON API for login and camera listing, and builds the
//! snapshot and RTSP urls the bridge proxies to controllers.

use std::pin::Pin;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use md5::{Digest, Md5};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::config::BlueirisConfig;

/// Camera entry reported by the recorder.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RecorderCamera {
    /// Short name used in recorder urls.
    #[serde(rename = "optionValue")]
    pub id: String,
    /// Display name.
    #[serde(rename = "optionDisplay")]
    pub name: String,
    #[serde(rename = "isOnline", default)]
    pub is_online: bool,
    #[serde(rename = "audio", default)]
    pub has_audio: bool,
    #[serde(rename = "group", default)]
    pub is_group: bool,
    #[serde(rename = "is_system", default)]
    pub is_system: bool,
    #[serde(rename = "type", default)]
    pub kind: i64,
}

impl RecorderCamera {
    /// Groups and system entries aggregate other cameras and have no stream of
    /// their own.
    pub fn is_streamable(&self) -> bool {
        !self.is_group && !self.is_system
    }
}

pub type SnapshotStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

#[async_trait]
pub trait Recorder: Send + Sync {
    /// List cameras known to the recorder.
    async fn list_cameras(&self) -> Result<Vec<RecorderCamera>>;
    /// Fetch a JPEG snapshot of `camera_id` as a byte stream.
    async fn fetch_snapshot(&self, camera_id: &str) -> Result<SnapshotStream>;
    /// RTSP url for `camera_id`, with credentials embedded.
    fn stream_source(&self, camera_id: &str) -> Result<Url>;
}

#[derive(Debug, Deserialize)]
struct LoginChallenge {
    session: String,
}

#[derive(Debug, Deserialize)]
struct CommandResult {
    #[serde(default)]
    result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CameraList {
    #[serde(default)]
    data: Vec<RecorderCamera>,
}

/// Blue Iris JSON API client.
pub struct BlueirisClient {
    base_url: Url,
    username: String,
    password: String,
    client: Client,
    session: RwLock<String>,
}

impl BlueirisClient {
    pub fn new(base_url: Url, cfg: &BlueirisConfig) -> Self {
        Self {
            base_url,
            username: cfg.username.clone(),
            password: cfg.password.clone(),
            client: Client::new(),
            session: RwLock::new(String::new()),
        }
    }

    /// Create a client and log in; failure here is fatal at startup.
    pub async fn connect(base_url: Url, cfg: &BlueirisConfig) -> Result<Self> {
        let client = Self::new(base_url, cfg);
        client.login().await?;
        Ok(client)
    }

    /// Two-step login: fetch a session token, then answer the md5 challenge.
    pub async fn login(&self) -> Result<()> {
        let mut session = self.session.write().await;

        let challenge: LoginChallenge = self
            .send(&json!({ "cmd": "login" }))
            .await
            .context("request blueiris session token")?;
        let response = login_response(&self.username, &challenge.session, &self.password);

        let result: CommandResult = self
            .send(&json!({
                "cmd": "login",
                "session": challenge.session,
                "response": response,
            }))
            .await
            .context("blueiris login")?;
        if result.result.as_deref() != Some("success") {
            return Err(anyhow!("unsuccessful blueiris login"));
        }

        *session = challenge.session;
        tracing::info!(instance = %self.base_url, "logged in to blueiris");
        Ok(())
    }

    /// Run a session-bound command, logging in again once if the session expired.
    async fn command<T: DeserializeOwned>(&self, cmd: &str) -> Result<T> {
        let first = self.command_once(cmd).await?;
        let value = if is_failed(&first) {
            tracing::warn!(cmd, "blueiris session rejected, logging in again");
            self.login().await?;
            self.command_once(cmd).await?
        } else {
            first
        };
        if is_failed(&value) {
            return Err(anyhow!("blueiris command {cmd} failed"));
        }
        serde_json::from_value(value).with_context(|| format!("decode blueiris {cmd} response"))
    }

    async fn command_once(&self, cmd: &str) -> Result<Value> {
        let session = self.session.read().await.clone();
        self.send(&json!({ "cmd": cmd, "session": session })).await
    }

    async fn send<T: DeserializeOwned>(&self, body: &Value) -> Result<T> {
        let url = join_path(&self.base_url, &["json"]);
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("blueiris request")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("blueiris request failed with status {status}"));
        }
        resp.json::<T>().await.context("decode blueiris response")
    }
}

#[async_trait]
impl Recorder for BlueirisClient {
    async fn list_cameras(&self) -> Result<Vec<RecorderCamera>> {
        let list: CameraList = self.command("camlist").await?;
        Ok(list.data)
    }

    async fn fetch_snapshot(&self, camera_id: &str) -> Result<SnapshotStream> {
        let url = join_path(&self.base_url, &["image", camera_id]);
        let resp = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .with_context(|| format!("fetch snapshot for {camera_id}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("snapshot for {camera_id} failed with status {status}"));
        }
        let stream = resp
            .bytes_stream()
            .map_err(std::io::Error::other);
        Ok(Box::pin(stream))
    }

    fn stream_source(&self, camera_id: &str) -> Result<Url> {
        rtsp_source(&self.base_url, camera_id, &self.username, &self.password)
    }
}

/// md5 of `user:session:password`, hex encoded.
fn login_response(username: &str, session: &str, password: &str) -> String {
    let digest = Md5::digest(format!("{username}:{session}:{password}").as_bytes());
    hex::encode(digest)
}

fn is_failed(value: &Value) -> bool {
    value.get("result").and_then(Value::as_str) == Some("fail")
}

fn join_path(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty();
        path.extend(segments);
    }
    url
}

/// The recorder serves RTSP on the same host and port as its web server.
pub fn rtsp_source(base: &Url, camera_id: &str, username: &str, password: &str) -> Result<Url> {
    let host = base
        .host_str()
        .ok_or_else(|| anyhow!("recorder url has no host"))?;
    let authority = match base.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    let mut source = Url::parse(&format!("rtsp://{authority}/"))
        .with_context(|| format!("build rtsp url for {authority}"))?;
    {
        let base_segments: Vec<&str> = base
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        let mut path = source
            .path_segments_mut()
            .map_err(|_| anyhow!("rtsp url cannot have a path"))?;
        path.clear();
        path.extend(base_segments);
        path.push(camera_id);
    }
    source
        .set_username(username)
        .map_err(|_| anyhow!("rtsp url rejects username"))?;
    source
        .set_password(Some(password))
        .map_err(|_| anyhow!("rtsp url rejects password"))?;
    Ok(source)
}
