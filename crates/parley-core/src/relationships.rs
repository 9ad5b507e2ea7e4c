//! Friend graph: directed edges with a small state machine.
//!
//! ```text
//! pending --accept--> accepted
//! pending --block---> blocked
//! accepted --block--> blocked
//! blocked --unblock-> pending
//! ```
//!
//! Either party of an edge may drive any transition; deciding who should
//! is left to the caller. Edges are never deleted. Friendship is not
//! symmetrized: an accepted `a -> b` edge puts `b` in `a`'s list only.

use chrono::Utc;
use tracing::info;

use parley_db::Database;
use parley_db::models::{FriendEdgeRow, UserRow};
use parley_db::queries::NewEdge;
use parley_types::models::{EdgeId, FriendEdge, FriendStatus, User, UserId};

use crate::error::{ChatError, Result};

/// Open a pending edge `requester -> target`.
pub fn send_friend_request(
    db: &Database,
    requester: UserId,
    target_id: UserId,
) -> Result<FriendEdge> {
    if requester == target_id {
        return Err(ChatError::InvalidRelationship(
            "cannot send a friend request to yourself".into(),
        ));
    }
    if !db.user_exists(target_id)? {
        return Err(ChatError::UserNotFound(target_id.to_string()));
    }

    match db.insert_friend_edge(requester, target_id, Utc::now())? {
        NewEdge::Created(row) => {
            info!("Friend request {}: {} -> {}", row.id, requester, target_id);
            Ok(row.try_into()?)
        }
        NewEdge::Exists(_) => Err(ChatError::RelationshipExists),
    }
}

pub fn get_edge(db: &Database, edge_id: EdgeId) -> Result<FriendEdge> {
    let row = db
        .get_friend_edge(edge_id)?
        .ok_or(ChatError::EdgeNotFound(edge_id))?;
    Ok(row.try_into()?)
}

/// The edge for the ordered pair, if one exists.
pub fn find_edge(db: &Database, requester: UserId, target: UserId) -> Result<Option<FriendEdge>> {
    match db.find_friend_edge(requester, target)? {
        Some(row) => Ok(Some(row.try_into()?)),
        None => Ok(None),
    }
}

/// `pending -> accepted`.
pub fn accept_friend_request(db: &Database, actor: UserId, edge_id: EdgeId) -> Result<FriendEdge> {
    transition(db, actor, edge_id, &[FriendStatus::Pending], FriendStatus::Accepted)
}

/// `pending | accepted -> blocked`.
pub fn block_friend(db: &Database, actor: UserId, edge_id: EdgeId) -> Result<FriendEdge> {
    transition(
        db,
        actor,
        edge_id,
        &[FriendStatus::Pending, FriendStatus::Accepted],
        FriendStatus::Blocked,
    )
}

/// `blocked -> pending`. The edge has to be accepted again afterwards.
pub fn unblock_friend(db: &Database, actor: UserId, edge_id: EdgeId) -> Result<FriendEdge> {
    transition(db, actor, edge_id, &[FriendStatus::Blocked], FriendStatus::Pending)
}

fn transition(
    db: &Database,
    actor: UserId,
    edge_id: EdgeId,
    allowed_from: &[FriendStatus],
    to: FriendStatus,
) -> Result<FriendEdge> {
    let mut edge = get_edge(db, edge_id)?;
    if !edge.involves(actor) {
        return Err(ChatError::Forbidden(
            "only the two parties of a friend request may change it".into(),
        ));
    }
    if !allowed_from.contains(&edge.status) {
        return Err(ChatError::InvalidTransition { from: edge.status, to });
    }

    if !db.update_friend_status(edge_id, edge.status.as_str(), to.as_str())? {
        // Lost a race with another transition; report what it is now.
        let current = get_edge(db, edge_id)?;
        return Err(ChatError::InvalidTransition { from: current.status, to });
    }

    info!(
        "Friend edge {} ({} -> {}): {} -> {} by {}",
        edge_id, edge.requester_id, edge.target_id, edge.status, to, actor
    );
    edge.status = to;
    Ok(edge)
}

/// Accepted edges where `user` is the requester, oldest first.
pub fn list_accepted_friends(db: &Database, user: UserId) -> Result<Vec<(User, FriendEdge)>> {
    collect_pairs(db.list_outgoing_edges(user, FriendStatus::Accepted.as_str())?)
}

/// Pending edges targeting `user`, paired with the requester.
pub fn list_incoming_requests(db: &Database, user: UserId) -> Result<Vec<(User, FriendEdge)>> {
    collect_pairs(db.list_incoming_edges(user, FriendStatus::Pending.as_str())?)
}

fn collect_pairs(
    rows: Vec<(UserRow, FriendEdgeRow)>,
) -> Result<Vec<(User, FriendEdge)>> {
    rows.into_iter()
        .map(|(user, edge)| -> Result<(User, FriendEdge)> {
            Ok((User::from(user), FriendEdge::try_from(edge)?))
        })
        .collect()
}
