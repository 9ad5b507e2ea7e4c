use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{GroupId, GroupRole, MessageId, UserId};

// -- JWT Claims --

/// JWT claims issued by the auth handlers and checked by the middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: UserId,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub username: String,
    pub token: String,
}

// -- Users --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendSummary {
    pub id: UserId,
    pub username: String,
    pub avatar: String,
    pub about: String,
    pub online: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub avatar: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub about_me: Option<String>,
    pub avatar: Option<String>,
}

// -- Friends --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FriendRequestBody {
    pub user_id: Option<UserId>,
}

#[derive(Debug, Serialize)]
pub struct FriendRequestView {
    pub edge_id: i64,
    pub from: UserSummary,
    pub created_at: DateTime<Utc>,
}

// -- Messages --

/// Both fields are optional so a missing one surfaces as a structured 400
/// instead of a body-deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub recipient_id: Option<UserId>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendGroupMessageRequest {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub user_id: Option<UserId>,
}

#[derive(Debug, Serialize)]
pub struct SentMessage {
    pub id: MessageId,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub sender: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub status: &'static str,
    pub message: SentMessage,
}

/// One message in a conversation, rendered from the viewer's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub id: MessageId,
    pub sender_id: UserId,
    pub sender: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    /// Absent for group messages, which carry no read state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
    pub is_me: bool,
    /// False when the encrypted body failed to verify and `body` is the
    /// stored plaintext copy.
    pub verified: bool,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread: u64,
}

// -- Groups --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddMemberRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleAdminRequest {
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct ToggleAdminResponse {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub role: GroupRole,
}

// -- Errors --

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}
