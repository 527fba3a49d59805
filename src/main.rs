use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use spineml_net::config::loader::load_config;
use spineml_net::lifecycle::{signals, startup};
use spineml_net::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "spineml-net")]
#[command(about = "SpineML network stream server", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// How long to wait for workers on shutdown, in seconds.
    #[arg(long, default_value_t = 5)]
    drain_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref(), args.bind.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!("spineml-net v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        stall_limit = config.protocol.stall_limit,
        preload = config.preload.len(),
        relay = config.relay.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let running = startup::start(&config).await?;
    tracing::info!(address = %running.local_addr(), "Listening for stream clients");

    signals::wait_for_signal().await;

    if !running.stop(Duration::from_secs(args.drain_secs)).await {
        tracing::warn!("Exiting with workers still running");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
