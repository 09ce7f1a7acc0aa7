//! Shared application state.

use crate::db::DbPool;
use crate::services::notification_service::Notifier;

/// State shared with every handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub pool: DbPool,

    /// Handle to the best-effort notification dispatcher
    pub notifier: Notifier,
}
