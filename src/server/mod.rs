//! HTTP server
//!
//! JSON API over the prediction service and the retraining orchestrator.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::{ModelSummary, PredictRecordRequest, PredictRequest, RetrainRequest};
pub use state::AppState;

use crate::config::ServiceConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Start the server, loading the stored model first if there is one
pub async fn run_server(config: ServiceConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    let state = Arc::new(AppState::from_config(config.clone()));
    state.load_model();

    let app = create_router(Arc::clone(&state));

    let addr: SocketAddr = config.address().parse()?;
    info!(
        address = %addr,
        train_data = %config.train_data,
        model_path = %config.model_path,
        target = %config.target,
        started_at = %start_time.to_rfc3339(),
        "Churn service starting"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received, stopping server gracefully");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
