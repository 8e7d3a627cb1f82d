//! services/bridge/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::coordinator::Coordinator;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub config: Arc<Config>,
}
