use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use parley_core::{ChatError, identity};
use parley_types::api::Claims;

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// Extract and validate the JWT from the Authorization header, then record
/// the caller as seen.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::Unauthorized
    })?;

    let user_id = token_data.claims.sub;
    let touched = run_blocking(&state, move |s| {
        identity::touch_last_seen(&s.db, user_id, Utc::now())
    })
    .await;
    match touched {
        Ok(()) => {}
        // Token outlived its account.
        Err(ApiError::Chat(ChatError::UserNotFound(_))) => return Err(ApiError::Unauthorized),
        Err(e) => return Err(e),
    }

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}
