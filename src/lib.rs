pub mod config;
pub mod rest;
pub mod storage;
pub mod tasks;

use std::sync::Arc;

use config::ServiceConfig;
use storage::Storage;
use tasks::TaskStorage;

/// Shared application state passed to every REST handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServiceConfig>,
    pub storage: Arc<Storage>,
    /// Task table operations (shares the storage pool).
    pub tasks: Arc<TaskStorage>,
    pub started_at: std::time::Instant,
}
