//! Conversation store: sending messages and read receipts.
//!
//! Each message row keeps the plaintext body next to its encrypted form.
//! The read path opens the encrypted form and only falls back to the
//! plaintext when that fails (see `retrieval`).

use chrono::Utc;
use tracing::debug;

use parley_crypto::{MessageKey, encrypt_message};
use parley_db::Database;
use parley_types::models::{DirectMessage, GroupId, GroupMessage, MessageId, UserId};

use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::groups;

fn require_body(plaintext: &str) -> Result<()> {
    if plaintext.trim().is_empty() {
        return Err(ChatError::InvalidInput("message body is required".into()));
    }
    Ok(())
}

/// Store a direct message from `sender` to `recipient_id`.
pub fn send_direct_message(
    db: &Database,
    key: &MessageKey,
    sender: UserId,
    recipient_id: UserId,
    plaintext: &str,
) -> Result<DirectMessage> {
    require_body(plaintext)?;
    if !db.user_exists(recipient_id)? {
        return Err(ChatError::RecipientNotFound(recipient_id));
    }

    let encrypted = encrypt_message(key, plaintext)?;
    let row = db.insert_direct_message(sender, recipient_id, plaintext, &encrypted, Utc::now())?;

    debug!("Direct message {} stored: {} -> {}", row.id, sender, recipient_id);
    Ok(row.into())
}

/// Store a message in a group. Non-members are rejected unless
/// `config.require_group_membership` is off.
pub fn send_group_message(
    db: &Database,
    key: &MessageKey,
    config: &ChatConfig,
    sender: UserId,
    group_id: GroupId,
    plaintext: &str,
) -> Result<GroupMessage> {
    require_body(plaintext)?;
    groups::get_group(db, group_id)?;
    if config.require_group_membership && !groups::is_member(db, group_id, sender)? {
        return Err(ChatError::Forbidden("only group members can post".into()));
    }

    let encrypted = encrypt_message(key, plaintext)?;
    let row = db.insert_group_message(group_id, sender, plaintext, &encrypted, Utc::now())?;

    debug!("Group message {} stored in group {} by {}", row.id, group_id, sender);
    Ok(row.into())
}

/// Mark a direct message read. Only its recipient may do this; repeating
/// it is a no-op.
pub fn mark_read(db: &Database, message_id: MessageId, reader: UserId) -> Result<()> {
    let message = db
        .get_direct_message(message_id)?
        .ok_or(ChatError::MessageNotFound(message_id))?;

    if message.recipient_id != reader {
        return Err(ChatError::Forbidden(
            "only the recipient can mark a message read".into(),
        ));
    }
    if !message.is_read {
        db.mark_direct_message_read(message_id)?;
    }
    Ok(())
}

/// Unread direct messages addressed to `user`.
pub fn unread_count(db: &Database, user: UserId) -> Result<u64> {
    Ok(db.count_unread_direct_messages(user)?)
}
