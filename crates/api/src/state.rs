use std::sync::Arc;

use cinerec_core::scripting::bridge::ScriptBridge;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is `Copy`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Runs the recommender workers.
    pub bridge: Arc<ScriptBridge>,
    /// Whether the worker runtime answered `--version` at startup.
    pub runtime_available: bool,
}
