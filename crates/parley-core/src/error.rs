use parley_crypto::CryptoError;
use parley_types::models::{EdgeId, FriendStatus, GroupId, MessageId, UserId};
use thiserror::Error;

/// Failures of core operations. Every variant reaches the caller; none
/// are retried.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("recipient {0} not found")]
    RecipientNotFound(UserId),

    #[error("user {0} not found")]
    UserNotFound(String),

    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    #[error("message {0} not found")]
    MessageNotFound(MessageId),

    #[error("friend request {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid relationship: {0}")]
    InvalidRelationship(String),

    #[error("a friend request between these users already exists")]
    RelationshipExists,

    #[error("friend request cannot go from {from} to {to}")]
    InvalidTransition { from: FriendStatus, to: FriendStatus },

    /// A concurrent update changed the row between read and write.
    #[error("conflicting update: {0}")]
    Conflict(String),

    #[error("user is already a member of this group")]
    AlreadyMember,

    #[error("user is not a member of this group")]
    NotMember,

    #[error("username is already taken")]
    UsernameTaken,

    #[error("email is already registered")]
    EmailTaken,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;
