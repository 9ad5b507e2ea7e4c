//! Identity store: registration, lookup, profile edits and last-seen.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use parley_db::Database;
use parley_db::queries::NewUser;
use parley_types::models::{User, UserId};

use crate::error::{ChatError, Result};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 64;
pub const EMAIL_MAX: usize = 120;
pub const ABOUT_ME_MAX: usize = 140;
pub const AVATAR_MAX: usize = 120;

/// Strip one leading `@`, the handle prefix users tend to type.
pub fn normalize_handle(raw: &str) -> &str {
    raw.strip_prefix('@').unwrap_or(raw)
}

/// Create a user. `password_hash` must already be hashed; raw passwords
/// never reach the store.
pub fn register_user(
    db: &Database,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User> {
    let username = normalize_handle(username.trim());
    let email = email.trim();

    validate_username(username)?;
    validate_email(email)?;
    if password_hash.is_empty() {
        return Err(ChatError::InvalidInput("password hash is required".into()));
    }

    match db.create_user(username, email, password_hash, Utc::now())? {
        NewUser::Created(row) => {
            info!("Registered user {} ({})", row.username, row.id);
            Ok(row.into())
        }
        NewUser::UsernameTaken => Err(ChatError::UsernameTaken),
        NewUser::EmailTaken => Err(ChatError::EmailTaken),
    }
}

pub fn get_user(db: &Database, id: UserId) -> Result<User> {
    db.get_user_by_id(id)?
        .map(User::from)
        .ok_or_else(|| ChatError::UserNotFound(id.to_string()))
}

pub fn find_by_username(db: &Database, username: &str) -> Result<Option<User>> {
    Ok(db.get_user_by_username(normalize_handle(username.trim()))?.map(User::from))
}

pub fn find_by_email(db: &Database, email: &str) -> Result<Option<User>> {
    Ok(db.get_user_by_email(email.trim())?.map(User::from))
}

/// Stored password hash for a username, used by the login adapter.
pub fn credentials_for(db: &Database, username: &str) -> Result<Option<(User, String)>> {
    Ok(db
        .get_user_by_username(normalize_handle(username.trim()))?
        .map(|row| {
            let hash = row.password_hash.clone();
            (User::from(row), hash)
        }))
}

pub fn update_profile(
    db: &Database,
    user_id: UserId,
    about_me: Option<&str>,
    avatar: Option<&str>,
) -> Result<User> {
    if let Some(about) = about_me {
        if about.chars().count() > ABOUT_ME_MAX {
            return Err(ChatError::InvalidInput(format!(
                "about me is limited to {} characters",
                ABOUT_ME_MAX
            )));
        }
    }
    if let Some(avatar) = avatar {
        if avatar.trim().is_empty() || avatar.len() > AVATAR_MAX {
            return Err(ChatError::InvalidInput("avatar reference is invalid".into()));
        }
    }

    db.update_profile(user_id, about_me, avatar)?
        .map(User::from)
        .ok_or_else(|| ChatError::UserNotFound(user_id.to_string()))
}

/// Refresh last-seen; called on every authenticated action.
pub fn touch_last_seen(db: &Database, user_id: UserId, at: DateTime<Utc>) -> Result<()> {
    if db.touch_last_seen(user_id, at)? {
        Ok(())
    } else {
        Err(ChatError::UserNotFound(user_id.to_string()))
    }
}

pub fn is_online(last_seen: DateTime<Utc>, now: DateTime<Utc>, threshold: Duration) -> bool {
    now.signed_duration_since(last_seen) < threshold
}

fn validate_username(username: &str) -> Result<()> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(ChatError::InvalidInput(format!(
            "username must be {}-{} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ChatError::InvalidInput(
            "username may only contain letters, digits and underscores".into(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid || email.len() > EMAIL_MAX {
        return Err(ChatError::InvalidInput("email address is invalid".into()));
    }
    Ok(())
}
