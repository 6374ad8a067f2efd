//! Bearer-token gateway for protected routes.

use crate::db::User;
use crate::error::AppError;
use crate::server::AppState;
use crate::server::state::blocking;
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};

/// The authenticated user behind a request.
///
/// Taking this extractor makes a handler protected: the request is rejected
/// with 401 before the handler runs unless the bearer token is valid and its
/// user still exists.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or_else(|| {
            AppError::Unauthenticated("Missing Authorization header".to_string())
        })?;

        let auth = state.auth.clone();
        let user = blocking(move || auth.authenticate(&token)).await?;

        Ok(CurrentUser(user))
    }
}

/// Extract token from Authorization header.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
