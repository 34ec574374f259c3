//! Framecast client entry point.
//!
//! ```text
//! framecast-client                       Connect using framecast.toml / defaults
//! framecast-client ws://host:8765        Connect to the given publisher
//! framecast-client --config <path>       Use custom config TOML
//! framecast-client --gen-config          Dump default config and exit
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use framecast_core::{
    ClientStatus, ConnectionSession, FrameIngest, FrameSink, Liveness, ReconnectSupervisor,
    RenderLoop, WsConnector,
};

use framecast_client::config::ClientConfig;
use framecast_client::display::LogRenderer;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "framecast-client", about = "Framecast streaming video client")]
struct Cli {
    /// Publisher endpoint (overrides config). Example: ws://10.1.34.169:8765
    server: Option<String>,

    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "framecast.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ClientConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ClientConfig::load(&cli.config);
    if let Some(url) = cli.server {
        config.network.server_url = url;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("framecast-client v{}", env!("CARGO_PKG_VERSION"));
    info!("publisher: {}", config.network.server_url);
    info!(format = ?config.frames.format, "frame format");

    // ── 1. Shared state ─────────────────────────────────────────

    let liveness = Liveness::new();
    let status = ClientStatus::new();
    let sink = Arc::new(FrameSink::new(config.buffer.capacity));
    info!(capacity = sink.capacity(), "frame buffer ready");

    // ── 2. Render thread ────────────────────────────────────────

    let render = RenderLoop::new(
        Arc::clone(&sink),
        status.clone(),
        liveness.clone(),
        config.poll_timeout(),
    )
    .spawn(LogRenderer::new(config.stats_interval()))?;

    // ── 3. Ctrl-C → clear liveness ──────────────────────────────

    let ctrl_c = liveness.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            ctrl_c.shutdown();
        }
    });

    // ── 4. Network side ─────────────────────────────────────────

    let ingest = FrameIngest::new(config.frame_decoder(), Arc::clone(&sink), status.clone());
    let session = ConnectionSession::new(
        ingest,
        status,
        liveness.clone(),
        config.keepalive_interval(),
    );
    let connector = WsConnector::new(config.network.server_url.clone(), config.connect_timeout());
    let mut supervisor = ReconnectSupervisor::new(connector, session, config.reconnect_policy());

    supervisor.run().await;

    // ── 5. Shutdown ─────────────────────────────────────────────

    liveness.shutdown();
    match tokio::task::spawn_blocking(move || render.join()).await? {
        Ok(displayed) => info!(
            displayed,
            evicted = sink.evicted_count(),
            undisplayed = sink.drain().len(),
            "render thread finished"
        ),
        Err(_) => error!("render thread panicked"),
    }

    Ok(())
}
