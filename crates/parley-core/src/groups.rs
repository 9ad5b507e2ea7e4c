//! Group membership and roles.

use chrono::Utc;
use tracing::info;

use parley_db::Database;
use parley_db::queries::NewMember;
use parley_types::models::{Group, GroupId, GroupMember, GroupRole, UserId};

use crate::error::{ChatError, Result};
use crate::identity;

pub const GROUP_NAME_MAX: usize = 100;
pub const GROUP_DESCRIPTION_MAX: usize = 200;

/// Create a group owned by `owner`, who joins it with the `owner` role.
pub fn create_group(db: &Database, owner: UserId, name: &str, description: &str) -> Result<Group> {
    let name = name.trim();
    let description = description.trim();

    if name.is_empty() || name.chars().count() > GROUP_NAME_MAX {
        return Err(ChatError::InvalidInput(format!(
            "group name must be 1-{} characters",
            GROUP_NAME_MAX
        )));
    }
    if description.chars().count() > GROUP_DESCRIPTION_MAX {
        return Err(ChatError::InvalidInput(format!(
            "group description is limited to {} characters",
            GROUP_DESCRIPTION_MAX
        )));
    }

    let (group, _owner) = db.create_group(name, description, owner, Utc::now())?;
    info!("Group {} '{}' created by {}", group.id, group.name, owner);
    Ok(group.into())
}

pub fn get_group(db: &Database, group_id: GroupId) -> Result<Group> {
    db.get_group(group_id)?
        .map(Group::from)
        .ok_or(ChatError::GroupNotFound(group_id))
}

/// Add `username` to the group as a plain member. Only admins and the
/// owner may add people.
pub fn add_member(
    db: &Database,
    group_id: GroupId,
    actor: UserId,
    username: &str,
) -> Result<GroupMember> {
    get_group(db, group_id)?;

    match role_of(db, group_id, actor)? {
        Some(role) if role.can_manage_members() => {}
        _ => return Err(ChatError::Forbidden("only group admins can add members".into())),
    }

    let user = identity::find_by_username(db, username)?
        .ok_or_else(|| ChatError::UserNotFound(username.to_string()))?;

    match db.insert_group_member(group_id, user.id, GroupRole::Member.as_str(), Utc::now())? {
        NewMember::Joined(row) => {
            info!("User {} added to group {} by {}", user.id, group_id, actor);
            Ok(row.try_into()?)
        }
        NewMember::AlreadyMember(_) => Err(ChatError::AlreadyMember),
    }
}

/// Promote a member to admin, or demote an admin back to member.
/// Only the owner may do this, and the owner's own role never changes.
pub fn toggle_admin(
    db: &Database,
    group_id: GroupId,
    actor: UserId,
    user_id: UserId,
) -> Result<GroupRole> {
    let group = get_group(db, group_id)?;
    if group.owner_id != actor {
        return Err(ChatError::Forbidden("only the group owner can manage admins".into()));
    }
    if user_id == group.owner_id {
        return Err(ChatError::Forbidden("the group owner cannot be demoted".into()));
    }

    let current = role_of(db, group_id, user_id)?.ok_or(ChatError::NotMember)?;
    let next = match current {
        GroupRole::Member => GroupRole::Admin,
        GroupRole::Admin => GroupRole::Member,
        GroupRole::Owner => {
            return Err(ChatError::Forbidden("owner roles cannot be changed".into()));
        }
    };

    if !db.update_member_role(group_id, user_id, current.as_str(), next.as_str())? {
        return Err(ChatError::Conflict(format!(
            "role of user {} in group {} changed concurrently",
            user_id, group_id
        )));
    }

    info!("User {} in group {}: {} -> {}", user_id, group_id, current, next);
    Ok(next)
}

/// Members ordered by join time.
pub fn list_group_members(db: &Database, group_id: GroupId) -> Result<Vec<GroupMember>> {
    get_group(db, group_id)?;
    db.list_group_members(group_id)?
        .into_iter()
        .map(|row| -> Result<GroupMember> { Ok(row.try_into()?) })
        .collect()
}

pub fn is_member(db: &Database, group_id: GroupId, user_id: UserId) -> Result<bool> {
    Ok(role_of(db, group_id, user_id)?.is_some())
}

pub fn role_of(db: &Database, group_id: GroupId, user_id: UserId) -> Result<Option<GroupRole>> {
    match db.get_group_member(group_id, user_id)? {
        Some(row) => {
            let member: GroupMember = row.try_into()?;
            Ok(Some(member.role))
        }
        None => Ok(None),
    }
}

pub fn list_user_groups(db: &Database, user_id: UserId) -> Result<Vec<Group>> {
    Ok(db
        .list_groups_for_user(user_id)?
        .into_iter()
        .map(Group::from)
        .collect())
}
