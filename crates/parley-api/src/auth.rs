use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, warn};

use parley_core::{ChatError, identity};
use parley_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use parley_types::models::UserId;

use crate::error::ApiError;
use crate::extract::Json;
use crate::state::{AppState, run_blocking};

pub const PASSWORD_MIN: usize = 8;
const TOKEN_LIFETIME_DAYS: i64 = 30;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.password.chars().count() < PASSWORD_MIN {
        return Err(ChatError::InvalidInput(format!(
            "password must be at least {} characters",
            PASSWORD_MIN
        ))
        .into());
    }

    // Argon2 is CPU-bound, so hash alongside the insert.
    let user = run_blocking(&state, move |s| {
        let password_hash = hash_password(&req.password)?;
        identity::register_user(&s.db, &req.username, &req.email, &password_hash)
    })
    .await?;

    let token = create_token(&state.jwt_secret, user.id, &user.username).map_err(|e| {
        error!("Failed to sign token: {}", e);
        ApiError::Internal
    })?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.clone();
    let verified = run_blocking(&state, move |s| {
        let Some((user, stored_hash)) = identity::credentials_for(&s.db, &req.username)? else {
            return Ok(None);
        };
        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| anyhow::anyhow!("stored hash for user {} is malformed: {}", user.id, e))?;
        match Argon2::default().verify_password(req.password.as_bytes(), &parsed) {
            Ok(()) => Ok(Some(user)),
            Err(_) => Ok(None),
        }
    })
    .await?;

    let Some(user) = verified else {
        warn!("Failed login for '{}'", username);
        return Err(ApiError::InvalidCredentials);
    };

    let token = create_token(&state.jwt_secret, user.id, &user.username).map_err(|e| {
        error!("Failed to sign token: {}", e);
        ApiError::Internal
    })?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        username: user.username,
        token,
    }))
}

fn hash_password(password: &str) -> Result<String, ChatError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e).into())
}

pub fn create_token(secret: &str, user_id: UserId, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp()
            as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    #[test]
    fn token_roundtrips_claims() {
        let token = create_token("test-secret", 7, "alice").unwrap();
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, 7);
        assert_eq!(data.claims.username, "alice");

        assert!(
            decode::<Claims>(&token, &DecodingKey::from_secret(b"other"), &Validation::default())
                .is_err()
        );
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(b"correct horse", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"wrong horse", &parsed).is_err());
    }
}
