//! Server startup and graceful shutdown.
//!
//! [`run`] performs every fallible initialization step and reports failures
//! as a [`StartupError`] instead of panicking, so `main` can log the cause
//! and exit with a failure status.

use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use cinerec_core::scripting::bridge::ScriptBridge;

use crate::config::{ConfigError, ServerConfig};
use crate::router::build_app_router;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid HOST address '{host}': {source}")]
    Address {
        host: String,
        #[source]
        source: AddrParseError,
    },

    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Load configuration, check the worker runtime, and serve until a
/// shutdown signal arrives.
pub async fn run() -> Result<(), StartupError> {
    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    if config.worker_outlives_request() {
        tracing::warn!(
            worker_timeout_secs = config.worker.timeout_secs,
            request_timeout_secs = config.request_timeout_secs,
            "Worker timeout is not below the request timeout; slow workers will surface as HTTP 408"
        );
    }

    // --- Script bridge ---
    let bridge = Arc::new(ScriptBridge::new(config.worker.bridge_config()));
    let runtime_available = check_worker_setup(&bridge).await;

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        bridge: Arc::clone(&bridge),
        runtime_available,
    };
    let app = build_app_router(state, &config)?;

    // --- Start server ---
    let ip: IpAddr = config.host.parse().map_err(|source| StartupError::Address {
        host: config.host.clone(),
        source,
    })?;
    let addr = SocketAddr::new(ip, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    tracing::info!(%addr, "Starting server");

    let drain_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&bridge), drain_timeout))
        .await
        .map_err(StartupError::Serve)?;

    // Nothing is left to wait for; make sure no worker outlives the server.
    bridge.shutdown();
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Check the runtime and log what a misconfigured deployment would hit.
async fn check_worker_setup(bridge: &ScriptBridge) -> bool {
    let config = bridge.config();

    let runtime_available = match bridge.check_runtime().await {
        Ok(version) => {
            tracing::info!(runtime = %config.runtime, %version, "Worker runtime found");
            true
        }
        Err(e) => {
            tracing::warn!(
                runtime = %config.runtime,
                error = %e,
                "Worker runtime is not usable; recommendation requests will fail"
            );
            false
        }
    };

    if !config.script_dir.is_dir() {
        tracing::warn!(
            script_dir = %config.script_dir.display(),
            "Worker script directory does not exist"
        );
    }
    for key in config.environment.empty_keys() {
        tracing::warn!(var = key, "Worker environment variable is not set");
    }

    runtime_available
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix). Once the signal
/// arrives, in-flight requests get `drain_timeout` to finish before their
/// workers are cancelled.
async fn shutdown_signal(bridge: Arc<ScriptBridge>, drain_timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }

    tokio::spawn(async move {
        tokio::time::sleep(drain_timeout).await;
        tracing::warn!(
            drain_timeout_secs = drain_timeout.as_secs(),
            "Shutdown drain timed out, cancelling in-flight workers"
        );
        bridge.shutdown();
    });
}
