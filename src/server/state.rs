//! Server state management

use std::sync::Arc;

use super::shutdown::ShutdownState;
use crate::engine::MockEngine;

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    pub engine: Arc<MockEngine>,
    pub shutdown: Arc<ShutdownState>,
}

impl AppState {
    pub fn new(engine: Arc<MockEngine>, shutdown: Arc<ShutdownState>) -> Self {
        Self { engine, shutdown }
    }

    /// Whether responses carry the generator header and `_meta` field
    pub fn branding(&self) -> bool {
        !self.engine.config().server.hide_branding
    }
}
