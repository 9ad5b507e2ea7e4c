/// Shared domain models and HTTP DTOs.
///
/// `models` is what the core hands out; `api` is what goes over the wire.
/// Neither carries credentials or ciphertext encodings.
pub mod api;
pub mod models;
