//! depthcast-observer: entry point.
//!
//! ```text
//! depthcast-observer                          Connect with defaults
//! depthcast-observer --config <path>          Use custom config TOML
//! depthcast-observer --provider <addr>        Override the provider address
//! depthcast-observer --export-intrinsics <p>  Write the intrinsics table to <p>
//! depthcast-observer --gen-config             Dump default config and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use depthcast_observer::config::ObserverConfig;
use depthcast_observer::connection::ProviderConnection;
use depthcast_observer::export::write_intrinsics;
use depthcast_observer::summary::FrameSummary;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "depthcast-observer", about = "Depth frame observer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "depthcast-observer.toml")]
    config: PathBuf,

    /// Provider address (overrides config). Example: 192.168.1.40:7340
    #[arg(short, long)]
    provider: Option<String>,

    /// Write the intrinsics table as tab-separated text (overrides config).
    #[arg(long)]
    export_intrinsics: Option<PathBuf>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ObserverConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ObserverConfig::load(&cli.config);
    if let Some(addr) = cli.provider {
        config.network.provider_address = addr;
    }
    if let Some(path) = cli.export_intrinsics {
        config.capture.intrinsics_export = path.display().to_string();
        config.capture.want_intrinsics = true;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("depthcast-observer v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Connect and wait for the stream list ─────────────────

    let conn = ProviderConnection::connect(
        &config.network.provider_address,
        config.frame_size(),
        config.timeout(),
    )
    .await?;

    let streams = conn.wait_for_streams(config.timeout()).await?;
    info!("provider offers {} stream(s)", streams.len());

    // ── 2. Request frames ───────────────────────────────────────

    conn.start_capture(config.capture.want_intrinsics).await?;

    let receiver = conn.receiver().clone();
    let mut updates = receiver.subscribe();
    let mut report = tokio::time::interval(config.report_interval());
    let export = config.export_path();
    let mut tables_written = 0;

    // ── 3. Event loop ───────────────────────────────────────────

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let stats = receiver.stats();
                if stats.tables > tables_written {
                    tables_written = stats.tables;
                    if let (Some(path), Some(table)) = (&export, receiver.intrinsics()) {
                        match write_intrinsics(table, path.clone()).await {
                            Ok(path) => info!("intrinsics table written to {}", path.display()),
                            Err(e) => warn!("failed to write intrinsics table: {e}"),
                        }
                    }
                }
            }
            _ = report.tick() => {
                if !conn.is_connected() {
                    warn!("provider disconnected");
                    break;
                }
                if let Some(frame) = receiver.latest_frame() {
                    info!("{}", FrameSummary::of(&frame));
                }
                let stats = receiver.stats();
                info!(
                    frames = stats.frames,
                    tables = stats.tables,
                    dropped = stats.dropped,
                    "receiver stats"
                );
            }
        }
    }

    // ── 4. Shutdown ─────────────────────────────────────────────

    if conn.is_connected() {
        if let Err(e) = conn.stop_capture().await {
            warn!("failed to send stop request: {e}");
        }
    }
    conn.close().await;

    Ok(())
}
