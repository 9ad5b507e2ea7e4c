use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};
use thiserror::Error;

use crate::keys::MessageKey;

/// Leading byte of every token, so the layout can change later.
const TOKEN_VERSION: u8 = 0x01;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = 1 + NONCE_LEN;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed")]
    Encryption,

    /// Token was malformed, tampered with, or sealed under another key.
    #[error("decryption failed: {0}")]
    Decryption(&'static str),

    #[error("invalid message key")]
    InvalidKey,
}

/// Encrypt a message body with AES-256-GCM.
///
/// Returns `version || nonce || ciphertext+tag`. A fresh random nonce is
/// drawn on every call, so equal plaintexts never produce equal tokens.
pub fn encrypt_message(key: &MessageKey, plaintext: &str) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::Encryption)?;

    let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    token.push(TOKEN_VERSION);
    token.extend_from_slice(&nonce_bytes);
    token.extend_from_slice(&ciphertext);
    Ok(token)
}

/// Decrypt a token produced by [`encrypt_message`].
pub fn decrypt_message(key: &MessageKey, token: &[u8]) -> Result<String, CryptoError> {
    if token.len() < HEADER_LEN + TAG_LEN {
        return Err(CryptoError::Decryption("token too short"));
    }
    if token[0] != TOKEN_VERSION {
        return Err(CryptoError::Decryption("unknown token version"));
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let nonce = Nonce::from_slice(&token[1..HEADER_LEN]);

    let plaintext = cipher
        .decrypt(nonce, &token[HEADER_LEN..])
        .map_err(|_| CryptoError::Decryption("authentication tag mismatch"))?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::Decryption("plaintext is not UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::derive_key;

    fn test_key() -> MessageKey {
        derive_key(b"test-message-secret")
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = test_key();
        let message = "Hello from Parley! Привет 👋";

        let token = encrypt_message(&key, message).unwrap();
        assert_ne!(&token[HEADER_LEN..], message.as_bytes());

        let decrypted = decrypt_message(&key, &token).unwrap();
        assert_eq!(decrypted, message);
    }

    #[test]
    fn same_plaintext_yields_distinct_tokens() {
        let key = test_key();

        let a = encrypt_message(&key, "hello").unwrap();
        let b = encrypt_message(&key, "hello").unwrap();
        assert_ne!(a, b);
        assert_ne!(&a[1..HEADER_LEN], &b[1..HEADER_LEN]);

        assert_eq!(decrypt_message(&key, &a).unwrap(), "hello");
        assert_eq!(decrypt_message(&key, &b).unwrap(), "hello");
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let key = test_key();
        let token = encrypt_message(&key, "").unwrap();
        assert_eq!(token.len(), HEADER_LEN + TAG_LEN);
        assert_eq!(decrypt_message(&key, &token).unwrap(), "");
    }

    #[test]
    fn wrong_key_fails() {
        let key1 = derive_key(b"first secret");
        let key2 = derive_key(b"second secret");

        let token = encrypt_message(&key1, "Secret message").unwrap();
        let result = decrypt_message(&key2, &token);
        assert!(matches!(result, Err(CryptoError::Decryption(_))));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = test_key();
        let mut token = encrypt_message(&key, "do not touch").unwrap();
        let last = token.len() - 1;
        token[last] ^= 0x01;

        assert!(matches!(
            decrypt_message(&key, &token),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn malformed_tokens_fail() {
        let key = test_key();
        assert!(matches!(
            decrypt_message(&key, &[]),
            Err(CryptoError::Decryption("token too short"))
        ));

        let mut token = encrypt_message(&key, "versioned").unwrap();
        token[0] = 0x80;
        assert!(matches!(
            decrypt_message(&key, &token),
            Err(CryptoError::Decryption("unknown token version"))
        ));
    }
}
