//! Headless runner for the Ember energy automaton.

mod config;
mod runner;
mod snapshot;
mod telemetry;

use anyhow::Result;
use ember_core::RunnerConfig;
use std::future::Future;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let path = config::config_path(std::env::args_os().nth(1).map(PathBuf::from));
    let config = config::load_config(path.as_deref())?;

    // Initialize telemetry
    telemetry::init_telemetry(config.otel_endpoint.as_deref())?;

    // Flush telemetry whether the run succeeds, fails or is interrupted
    with_shutdown(run(&config), telemetry::shutdown_telemetry).await
}

async fn run(config: &RunnerConfig) -> Result<()> {
    info!(
        "Starting Ember: {} panels, {}x{}, {} frames, noise {}",
        config.simulation.panels.len(),
        config.simulation.width,
        config.simulation.height,
        config.simulation.frames,
        config.simulation.noise_probability
    );

    let store = snapshot::SnapshotStore::new(&config.snapshot_dir);
    let simulation = runner::prepare(config, &store).await?;

    let result = tokio::select! {
        result = runner::run_panels(simulation) => result?,
        _ = shutdown_signal() => {
            info!("Run interrupted, no snapshot written");
            return Ok(());
        }
    };

    result.emit_summary();
    store
        .save(&snapshot::Snapshot::from_result(&result))
        .await?;

    Ok(())
}

/// Await `work`, then call `shutdown` before handing back its outcome
async fn with_shutdown<T, F, S>(work: F, shutdown: S) -> Result<T>
where
    F: Future<Output = Result<T>>,
    S: FnOnce(),
{
    let outcome = work.await;
    if let Err(e) = &outcome {
        error!("Run failed: {:#}", e);
    }
    shutdown();
    outcome
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
