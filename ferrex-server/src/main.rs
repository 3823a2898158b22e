//! Host binary for the catalog core: loads configuration, builds and
//! starts [`ferrex_core::Core`], then blocks until a shutdown signal
//! arrives. No HTTP surface lives here: the core is a data plane a
//! host application wires a router on top of separately.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ferrex_contracts::TracingObserver;
use ferrex_core::Core;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Grace period for the shutdown sequence's per-step timeouts (§4.9).
const SHUTDOWN_STEP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Parser, Debug)]
#[command(name = "ferrex-server")]
#[command(about = "Runs the Ferrex catalog core until signalled to stop")]
struct Args {
    /// Path to a TOML config file. Missing fields fall back to defaults.
    #[arg(long, env = "FERREX_CONFIG", default_value = "ferrex.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ferrex_server=info,ferrex_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = if args.config.exists() {
        ferrex_config::load_from_file(&args.config)?
    } else {
        info!(path = %args.config.display(), "no config file found, using defaults");
        ferrex_config::Config::default()
    };

    let observer = Arc::new(TracingObserver);
    let core = Arc::new(Core::build(config, observer).await?);
    core.start().await;
    info!("core running, waiting for shutdown signal");

    wait_for_shutdown_signal().await;

    info!("shutdown signal received, stopping core");
    core.shutdown(SHUTDOWN_STEP_TIMEOUT).await;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(err) => {
            error!(%err, "failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
