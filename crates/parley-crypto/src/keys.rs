use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE as BASE64_URL};

use crate::encrypt::CryptoError;

/// Length of an AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

/// Secrets shorter than `KEY_LEN` are right-padded with this byte.
const PAD_BYTE: u8 = b' ';

/// The process-wide message key.
#[derive(Clone, PartialEq, Eq)]
pub struct MessageKey([u8; KEY_LEN]);

impl MessageKey {
    /// Parse the URL-safe base64 form produced by [`MessageKey::encoded`].
    pub fn from_encoded(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = BASE64_URL
            .decode(encoded)
            .map_err(|_| CryptoError::InvalidKey)?;
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self(key))
    }

    /// URL-safe base64 encoding of the key bytes.
    pub fn encoded(&self) -> String {
        BASE64_URL.encode(self.0)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

// Never print key material.
impl fmt::Debug for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MessageKey(..)")
    }
}

/// Derive the message key from the configured server secret.
///
/// The secret is truncated to 32 bytes, or right-padded with spaces when
/// shorter. The secret must not change between restarts: messages encrypted
/// under the old key stop decrypting.
pub fn derive_key(secret: &[u8]) -> MessageKey {
    let mut key = [PAD_BYTE; KEY_LEN];
    let len = secret.len().min(KEY_LEN);
    key[..len].copy_from_slice(&secret[..len]);
    MessageKey(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_secret_is_space_padded() {
        let key = derive_key(b"abc");
        let bytes = key.as_bytes();
        assert_eq!(&bytes[..3], b"abc");
        assert!(bytes[3..].iter().all(|b| *b == b' '));
    }

    #[test]
    fn long_secret_is_truncated() {
        let secret = [b'x'; 50];
        let key = derive_key(&secret);
        assert_eq!(key.as_bytes(), &[b'x'; KEY_LEN]);
        // Everything past the 32nd byte is ignored.
        let mut other = secret;
        other[40] = b'y';
        assert_eq!(derive_key(&other), key);
    }

    #[test]
    fn encoded_form_roundtrips() {
        let key = derive_key(b"0123456789abcdef0123456789abcdef");
        let encoded = key.encoded();
        assert_eq!(encoded.len(), 44);
        assert!(!encoded.contains('+') && !encoded.contains('/'));
        assert_eq!(MessageKey::from_encoded(&encoded).unwrap(), key);
    }

    #[test]
    fn rejects_wrong_length_encoding() {
        let short = BASE64_URL.encode([1u8; 16]);
        assert!(matches!(
            MessageKey::from_encoded(&short),
            Err(CryptoError::InvalidKey)
        ));
        assert!(MessageKey::from_encoded("not base64!").is_err());
    }

    #[test]
    fn debug_hides_key_bytes() {
        let key = derive_key(b"super-secret");
        assert_eq!(format!("{:?}", key), "MessageKey(..)");
    }
}
