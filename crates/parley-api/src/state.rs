use std::sync::Arc;

use tracing::error;

use parley_core::{ChatConfig, ChatError};
use parley_crypto::MessageKey;
use parley_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Key for message bodies. Kept apart from `jwt_secret`.
    pub message_key: MessageKey,
    pub chat: ChatConfig,
}

/// Run core work off the async runtime; rusqlite calls block.
pub async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ChatError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}
