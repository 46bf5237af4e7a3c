//! depthcast-provider: entry point.
//!
//! ```text
//! depthcast-provider                   Serve with depthcast-provider.toml
//! depthcast-provider --config <path>   Load a custom config TOML
//! depthcast-provider --listen <addr>   Override the listen address
//! depthcast-provider --gen-config      Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use depthcast_provider::config::ProviderConfig;
use depthcast_provider::service::ProviderService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "depthcast-provider", about = "Depth frame capture provider")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "depthcast-provider.toml")]
    config: PathBuf,

    /// Address to listen on, overriding the config file.
    #[arg(short, long)]
    listen: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ProviderConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ProviderConfig::load(&cli.config);
    if let Some(addr) = cli.listen {
        config.network.listen_address = addr;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("depthcast-provider v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "stream: {:?} / {:?} at {}@{}fps",
        config.stream.name_filter,
        config.stream.id_filter,
        config.frame_size(),
        config.stream.framerate
    );

    let service = ProviderService::new(config);
    let stop = service.stop_handle();

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.cancel();
    });

    service.run(None).await?;

    Ok(())
}
