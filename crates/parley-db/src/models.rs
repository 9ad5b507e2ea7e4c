//! Database row types. These map directly to SQLite rows.
//! Distinct from parley-types models to keep the DB layer independent;
//! enum columns stay as strings until converted.
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Row;

use parley_types::models::{
    DirectMessage, FriendEdge, FriendStatus, Group, GroupMember, GroupMessage, GroupRole, User,
};

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub about_me: String,
    pub avatar: String,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

pub struct FriendEdgeRow {
    pub id: i64,
    pub requester_id: i64,
    pub target_id: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

pub struct DirectMessageRow {
    pub id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub body: String,
    pub encrypted_body: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

pub struct GroupRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub avatar: String,
}

pub struct GroupMemberRow {
    pub id: i64,
    pub group_id: i64,
    pub user_id: i64,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

pub struct GroupMessageRow {
    pub id: i64,
    pub group_id: i64,
    pub sender_id: i64,
    pub body: String,
    pub encrypted_body: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

/// A message joined with its sender's username, as read back for a
/// conversation view. `is_read` is `None` for group messages.
pub struct ConversationRow {
    pub id: i64,
    pub sender_id: i64,
    pub sender_username: String,
    pub body: String,
    pub encrypted_body: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    pub is_read: Option<bool>,
}

// -- Column lists shared by the query modules --

pub(crate) const USER_COLUMNS: &str =
    "id, username, email, password_hash, about_me, avatar, last_seen, created_at";
pub(crate) const EDGE_COLUMNS: &str = "id, requester_id, target_id, status, created_at";
pub(crate) const GROUP_COLUMNS: &str = "id, name, description, owner_id, created_at, avatar";
pub(crate) const MEMBER_COLUMNS: &str = "id, group_id, user_id, role, joined_at";

impl UserRow {
    /// Maps `USER_COLUMNS` starting at column `offset`.
    pub(crate) fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            username: row.get(offset + 1)?,
            email: row.get(offset + 2)?,
            password_hash: row.get(offset + 3)?,
            about_me: row.get(offset + 4)?,
            avatar: row.get(offset + 5)?,
            last_seen: row.get(offset + 6)?,
            created_at: row.get(offset + 7)?,
        })
    }
}

impl FriendEdgeRow {
    pub(crate) fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            requester_id: row.get(offset + 1)?,
            target_id: row.get(offset + 2)?,
            status: row.get(offset + 3)?,
            created_at: row.get(offset + 4)?,
        })
    }
}

impl GroupRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            owner_id: row.get(3)?,
            created_at: row.get(4)?,
            avatar: row.get(5)?,
        })
    }
}

impl GroupMemberRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            group_id: row.get(1)?,
            user_id: row.get(2)?,
            role: row.get(3)?,
            joined_at: row.get(4)?,
        })
    }
}

// -- Row -> model conversions --

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            about_me: row.about_me,
            avatar: row.avatar,
            last_seen: row.last_seen,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<FriendEdgeRow> for FriendEdge {
    type Error = anyhow::Error;

    fn try_from(row: FriendEdgeRow) -> Result<Self> {
        let status = row
            .status
            .parse::<FriendStatus>()
            .with_context(|| format!("corrupt friend edge {}", row.id))?;
        Ok(FriendEdge {
            id: row.id,
            requester_id: row.requester_id,
            target_id: row.target_id,
            status,
            created_at: row.created_at,
        })
    }
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Group {
            id: row.id,
            name: row.name,
            description: row.description,
            owner_id: row.owner_id,
            created_at: row.created_at,
            avatar: row.avatar,
        }
    }
}

impl TryFrom<GroupMemberRow> for GroupMember {
    type Error = anyhow::Error;

    fn try_from(row: GroupMemberRow) -> Result<Self> {
        let role = row
            .role
            .parse::<GroupRole>()
            .with_context(|| format!("corrupt group membership {}", row.id))?;
        Ok(GroupMember {
            id: row.id,
            group_id: row.group_id,
            user_id: row.user_id,
            role,
            joined_at: row.joined_at,
        })
    }
}

impl From<DirectMessageRow> for DirectMessage {
    fn from(row: DirectMessageRow) -> Self {
        DirectMessage {
            id: row.id,
            sender_id: row.sender_id,
            recipient_id: row.recipient_id,
            body: row.body,
            encrypted_body: row.encrypted_body,
            timestamp: row.timestamp,
            is_read: row.is_read,
        }
    }
}

impl From<GroupMessageRow> for GroupMessage {
    fn from(row: GroupMessageRow) -> Self {
        GroupMessage {
            id: row.id,
            group_id: row.group_id,
            sender_id: row.sender_id,
            body: row.body,
            encrypted_body: row.encrypted_body,
            timestamp: row.timestamp,
        }
    }
}
