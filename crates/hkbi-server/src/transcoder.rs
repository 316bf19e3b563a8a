//! Transcoder process control.
//!
//! The stream controller drives external processes only through
//! [`TranscoderLauncher`] and [`TranscoderProcess`]. The ffmpeg implementation
//! spawns with `tokio::process` and signals with `nix`.

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use reqwest::Url;
use tokio::process::{Child, Command};

use hkbi_types::CryptoSuite;

/// Lifecycle signals the controller may send to a running transcoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessSignal {
    /// Graceful stop (SIGINT); ffmpeg flushes and exits.
    Interrupt,
    /// Pause (SIGSTOP).
    Stop,
    /// Continue after a pause (SIGCONT).
    Continue,
}

impl ProcessSignal {
    fn as_nix(self) -> Signal {
        match self {
            ProcessSignal::Interrupt => Signal::SIGINT,
            ProcessSignal::Stop => Signal::SIGSTOP,
            ProcessSignal::Continue => Signal::SIGCONT,
        }
    }
}

/// How a transcoder process ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExitReport {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitReport {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitReport {
    fn from(status: std::process::ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;
        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }
}

impl fmt::Display for ExitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit status {code}"),
            (None, Some(sig)) => match Signal::try_from(sig) {
                Ok(sig) => write!(f, "signal: {}", sig.as_str()),
                Err(_) => write!(f, "signal: {sig}"),
            },
            (None, None) => f.write_str("unknown exit status"),
        }
    }
}

/// A spawned transcoder owned by exactly one session.
#[async_trait]
pub trait TranscoderProcess: Send {
    /// OS process id, if the process has not been reaped yet.
    fn id(&self) -> Option<u32>;
    /// Deliver a lifecycle signal without waiting for any state change.
    fn signal(&self, signal: ProcessSignal) -> Result<()>;
    /// Wait for the process to exit and reap it.
    async fn wait(&mut self) -> Result<ExitReport>;
    /// Forcefully kill the process and reap it.
    async fn kill(&mut self) -> Result<ExitReport>;
}

/// Spawns transcoders for start commands.
pub trait TranscoderLauncher: Send + Sync {
    fn spawn(&self, job: &TranscodeJob) -> Result<Box<dyn TranscoderProcess>>;
}

/// Everything needed to forward one camera stream to one controller.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscodeJob {
    /// RTSP source on the recorder, credentials embedded.
    pub source: Url,
    pub payload_type: u8,
    pub ssrc: i32,
    pub crypto_suite: CryptoSuite,
    /// Base64 SRTP master key + salt.
    pub srtp_key: String,
    pub destination_addr: IpAddr,
    pub destination_port: u16,
    pub packet_size: u32,
}

impl TranscodeJob {
    /// SRTP (or plain RTP) sink url; RTCP shares the video port.
    pub fn destination(&self) -> String {
        let scheme = match self.crypto_suite.srtp_suite_name() {
            Some(_) => "srtp",
            None => "rtp",
        };
        let host = match self.destination_addr {
            IpAddr::V4(addr) => addr.to_string(),
            IpAddr::V6(addr) => format!("[{addr}]"),
        };
        format!(
            "{scheme}://{host}:{port}?rtcpport={port}&pkt_size={size}",
            port = self.destination_port,
            size = self.packet_size,
        )
    }

    /// ffmpeg arguments: pull the RTSP stream over TCP, drop everything but video,
    /// repeat parameter sets on key frames, and forward without re-encoding.
    pub fn ffmpeg_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "-an",
            "-rtsp_transport",
            "tcp",
            "-use_wallclock_as_timestamps",
            "1",
            "-i",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(self.source.to_string());
        args.extend(
            ["-an", "-sn", "-dn", "-bsf:v", "dump_extra", "-vcodec", "copy"]
                .iter()
                .map(|s| s.to_string()),
        );
        args.push("-payload_type".to_string());
        args.push(self.payload_type.to_string());
        args.push("-ssrc".to_string());
        args.push(self.ssrc.to_string());
        args.push("-f".to_string());
        args.push("rtp".to_string());
        if let Some(suite) = self.crypto_suite.srtp_suite_name() {
            args.push("-srtp_out_suite".to_string());
            args.push(suite.to_string());
            args.push("-srtp_out_params".to_string());
            args.push(self.srtp_key.clone());
        }
        args.push(self.destination());
        args
    }

    /// Source url with the password masked, for logs.
    pub fn redacted_source(&self) -> String {
        let mut source = self.source.clone();
        if source.password().is_some() {
            let _ = source.set_password(Some("***"));
        }
        source.to_string()
    }
}

/// Spawns ffmpeg with stdout/stderr forwarded to the bridge's console.
#[derive(Clone, Debug)]
pub struct FfmpegLauncher {
    binary: PathBuf,
}

impl FfmpegLauncher {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

impl TranscoderLauncher for FfmpegLauncher {
    fn spawn(&self, job: &TranscodeJob) -> Result<Box<dyn TranscoderProcess>> {
        tracing::debug!(
            binary = %self.binary.display(),
            source = %job.redacted_source(),
            destination = %job.destination(),
            payload_type = job.payload_type,
            ssrc = job.ssrc,
            "spawning transcoder"
        );
        let child = Command::new(&self.binary)
            .args(job.ffmpeg_args())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawn {}", self.binary.display()))?;
        Ok(Box::new(FfmpegProcess { child }))
    }
}

struct FfmpegProcess {
    child: Child,
}

#[async_trait]
impl TranscoderProcess for FfmpegProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn signal(&self, sig: ProcessSignal) -> Result<()> {
        let pid = self
            .child
            .id()
            .ok_or_else(|| anyhow!("process already exited"))?;
        let pid = i32::try_from(pid).context("pid out of range")?;
        signal::kill(Pid::from_raw(pid), sig.as_nix())
            .with_context(|| format!("send {:?} to pid {pid}", sig.as_nix()))
    }

    async fn wait(&mut self) -> Result<ExitReport> {
        let status = self.child.wait().await.context("wait for transcoder")?;
        Ok(status.into())
    }

    async fn kill(&mut self) -> Result<ExitReport> {
        self.child.kill().await.context("kill transcoder")?;
        self.wait().await
    }
}
