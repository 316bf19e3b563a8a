//! HomeKit bridge for Blue Iris cameras.
//!
//! Exposes each recorder camera as a streaming accessory and forwards live video
//! to controllers through an ffmpeg process per session.

mod accessory;
mod api;
mod config;
mod events;
mod identity;
mod models;
mod openapi;
mod recorder;
mod session_store;
mod startup;
mod state;
mod stream_controller;
mod transcoder;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hkbi")]
struct Args {
    /// HTTP bind address, e.g. 0.0.0.0:51826
    #[arg(long)]
    bind: Option<std::net::SocketAddr>,

    /// Bridge config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,actix_web=info,hkbi=debug")
        }))
        .init();

    startup::run(args).await
}
