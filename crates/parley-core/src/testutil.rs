use parley_crypto::{MessageKey, derive_key};
use parley_db::Database;
use parley_types::models::User;

use crate::identity;

pub fn db() -> Database {
    Database::open_in_memory().unwrap()
}

pub fn key() -> MessageKey {
    derive_key(b"core-test-secret")
}

pub fn user(db: &Database, name: &str) -> User {
    identity::register_user(db, name, &format!("{}@example.com", name), "argon2-hash").unwrap()
}
