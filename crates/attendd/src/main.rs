use anyhow::{Context, Result};
use attend_core::OnnxVerifier;
use attendd::engine::spawn_engine;
use attendd::error_log::FileErrorLog;
use attendd::{build_router, AppState, Config};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("attendd starting");

    let config = Config::from_env();

    // Load models synchronously (fail-fast)
    let verifier = OnnxVerifier::load(&config.scrfd_model_path(), &config.arcface_model_path())
        .map_err(|e| anyhow::anyhow!("failed to load models from {}: {e}", config.model_dir.display()))?;
    let engine = spawn_engine(verifier, Duration::from_secs(config.verify_timeout_secs))
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let error_log = FileErrorLog::open(&config.error_log_path)
        .with_context(|| format!("opening error log {}", config.error_log_path.display()))?;

    tokio::fs::create_dir_all(&config.temp_images_dir)
        .await
        .with_context(|| format!("creating {}", config.temp_images_dir.display()))?;

    let bind_addr = config.bind_addr;
    tracing::info!(
        employee_images = %config.employee_images_dir.display(),
        temp_images = %config.temp_images_dir.display(),
        metric = %config.distance_metric,
        enforce_detection = config.enforce_detection,
        "configuration loaded"
    );

    let state = AppState::new(config, engine, Arc::new(error_log));
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;

    tracing::info!(addr = %bind_addr, "attendd ready");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("attendd shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
