/// Parley Crypto Library
///
/// At-rest encryption for message bodies: one server-held symmetric key
/// (derived from `PARLEY_MESSAGE_SECRET`) and AES-256-GCM.
///
/// Anyone holding the server secret can read every message. This is not
/// end-to-end encryption and is not meant to be.
pub mod encrypt;
pub mod keys;

pub use encrypt::{CryptoError, decrypt_message, encrypt_message};
pub use keys::{KEY_LEN, MessageKey, derive_key};
