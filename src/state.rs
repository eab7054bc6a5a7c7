//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::config::Settings;
use crate::connection::ConnectionManager;
use crate::snapshot::SnapshotStore;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Dynamic connection manager for multi-database support
    pub connections: ConnectionManager,

    /// Latest analysed snapshot per connection
    pub snapshots: SnapshotStore,
}

impl AppState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            connections: ConnectionManager::new(&settings.database, &settings.analyser),
            snapshots: SnapshotStore::new(),
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
