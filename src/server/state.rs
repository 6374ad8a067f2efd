//! Application state shared across handlers.

use crate::auth::{AuthService, TokenService};
use crate::catalog::CatalogService;
use crate::config::AuthConfig;
use crate::db::Database;
use crate::error::{AppError, Result};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Authentication service.
    pub auth: Arc<AuthService>,
    /// Book and review service.
    pub catalog: Arc<CatalogService>,
}

impl AppState {
    /// Build the state from auth settings and an open database.
    pub fn new(config: &AuthConfig, db: Database) -> Result<Self> {
        let tokens = TokenService::new(&config.jwt_secret, config.token_hours)?;

        Ok(Self {
            auth: Arc::new(AuthService::new(db.clone(), tokens)),
            catalog: Arc::new(CatalogService::new(db)),
        })
    }
}

/// Run store access or password hashing on the blocking pool.
pub async fn blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))?
}
