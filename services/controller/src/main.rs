//! Autoscaling controller
//!
//! Loads the desired scalable targets and scaling policies from a JSON
//! manifest and reconciles them on an interval until interrupted. The
//! service backend is the in-memory implementation for now.

use std::sync::Arc;

use anyhow::Result;
use appscale_controller::{
    Config, ControllerWorker, InMemoryAutoscaling, ManagerContext, Manifest, WorkerConfig,
};
use appscale_reconcile::TracingRecorder;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing; RUST_LOG wins over APPSCALE_LOG_LEVEL
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting autoscaling controller");
    info!(
        account_id = %config.account_id,
        region = %config.region,
        manifest = %config.manifest_path.display(),
        strict_lookup = config.strict_lookup,
        "Configuration loaded"
    );

    let manifest = Manifest::load(&config.manifest_path)?;
    info!(
        scalable_targets = manifest.scalable_targets.len(),
        scaling_policies = manifest.scaling_policies.len(),
        "Manifest loaded"
    );

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Create the backend (in-memory for now)
    let api = Arc::new(InMemoryAutoscaling::new(&config.account_id, &config.region));
    let ctx = ManagerContext::new(api, Arc::new(TracingRecorder), config.account())
        .with_strict_lookup(config.strict_lookup);

    let worker = Arc::new(ControllerWorker::new(
        ctx,
        manifest,
        WorkerConfig::from(&config),
    ));
    let worker_handle = tokio::spawn({
        let worker = Arc::clone(&worker);
        async move { worker.run(shutdown_rx).await }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = worker_handle => {
            if let Err(e) = result {
                error!(error = %e, "Worker task panicked");
            }
            info!("Worker exited");
        }
    }

    // Signal shutdown; a pass in flight is dropped at its next await point
    let _ = shutdown_tx.send(true);

    info!("Controller shutdown complete");
    Ok(())
}
