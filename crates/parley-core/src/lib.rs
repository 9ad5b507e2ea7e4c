//! Parley core: the encrypted messaging and relationship store.
//!
//! Every operation takes its collaborators explicitly: a `&Database` for
//! persistence, a `&MessageKey` where bodies are sealed or opened, and a
//! `&ChatConfig` where behavior is tunable. Nothing here holds global state.

pub mod config;
pub mod conversations;
pub mod error;
pub mod groups;
pub mod identity;
pub mod relationships;
pub mod retrieval;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::ChatConfig;
pub use error::{ChatError, Result};
