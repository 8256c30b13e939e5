//! login-guard 维护进程
//!
//! 加载配置、初始化遥测、连接存储并周期性清理过期记录。

use anyhow::Context;
use cuba_config::AppConfig;
use login_guard::{CleanupTask, build_store};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_dir = std::env::var("LOGIN_GUARD_CONFIG_DIR")
        .unwrap_or_else(|_| "services/login-guard/config".to_string());
    let config = AppConfig::load(&config_dir).context("failed to load configuration")?;

    cuba_telemetry::init(&config.telemetry.log_level, config.telemetry.json);
    match config.telemetry.metrics_addr {
        Some(addr) => match cuba_telemetry::init_metrics(addr) {
            Ok(()) => info!(%addr, "Prometheus exporter listening"),
            Err(e) => warn!(error = %e, %addr, "Prometheus exporter not installed"),
        },
        None => info!("Metrics exporter disabled"),
    }

    info!(
        app_name = %config.app_name,
        app_env = %config.app_env,
        backend = ?config.storage.backend,
        "Starting login guard"
    );

    let store = build_store(&config.storage)
        .await
        .context("failed to initialise attempt store")?;

    let shutdown = CancellationToken::new();
    let cleanup = config.cleanup.enabled.then(|| {
        Arc::new(CleanupTask::new(
            store,
            Duration::from_secs(config.cleanup.interval_secs),
        ))
        .start(shutdown.clone())
    });

    shutdown_signal().await;
    info!("Shutdown signal received");

    shutdown.cancel();
    if let Some(handle) = cleanup {
        if let Err(e) = handle.await {
            warn!(error = %e, "Cleanup task ended abnormally");
        }
    }

    info!("Login guard stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
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
}
