//! Read-side views: friend lists, user search and conversations.
//!
//! Nothing here writes. Reading a conversation does not mark it read.

use chrono::{DateTime, Utc};
use tracing::warn;

use parley_crypto::{MessageKey, decrypt_message};
use parley_db::Database;
use parley_db::models::ConversationRow;
use parley_types::api::{ConversationEntry, FriendSummary, UserSummary};
use parley_types::models::{GroupId, UserId};

use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::identity::{is_online, normalize_handle};
use crate::{groups, relationships};

/// Upper bound on search results.
pub const SEARCH_LIMIT: u32 = 10;

/// Accepted friends of `user` (outgoing edges only) with their online state
/// as of `now`.
pub fn get_friends_view(
    db: &Database,
    config: &ChatConfig,
    user: UserId,
    now: DateTime<Utc>,
) -> Result<Vec<FriendSummary>> {
    let friends = relationships::list_accepted_friends(db, user)?;

    Ok(friends
        .into_iter()
        .map(|(friend, _edge)| FriendSummary {
            online: is_online(friend.last_seen, now, config.online_threshold),
            id: friend.id,
            username: friend.username,
            avatar: friend.avatar,
            about: friend.about_me,
        })
        .collect())
}

/// Find users whose username or email contains `query`, ignoring case.
/// An empty query returns nothing without touching storage.
pub fn search_users(db: &Database, query: &str, excluding: UserId) -> Result<Vec<UserSummary>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let needle = normalize_handle(query);

    let rows = db.search_users(needle, excluding, SEARCH_LIMIT)?;
    Ok(rows
        .into_iter()
        .map(|row| UserSummary {
            id: row.id,
            username: row.username,
            avatar: row.avatar,
        })
        .collect())
}

/// Full direct-message history between `viewer` and `other`, oldest first.
pub fn get_conversation(
    db: &Database,
    key: &MessageKey,
    viewer: UserId,
    other: UserId,
) -> Result<Vec<ConversationEntry>> {
    let rows = db.list_direct_conversation(viewer, other)?;
    Ok(rows.into_iter().map(|row| render_entry(key, viewer, row)).collect())
}

/// Full history of a group, oldest first. Only members may read it.
pub fn get_group_conversation(
    db: &Database,
    key: &MessageKey,
    viewer: UserId,
    group_id: GroupId,
) -> Result<Vec<ConversationEntry>> {
    groups::get_group(db, group_id)?;
    if !groups::is_member(db, group_id, viewer)? {
        return Err(ChatError::Forbidden("only group members can read this group".into()));
    }

    let rows = db.list_group_conversation(group_id)?;
    Ok(rows.into_iter().map(|row| render_entry(key, viewer, row)).collect())
}

/// Open one message for display. A body that fails to decrypt falls back
/// to the stored plaintext with `verified = false`; its siblings are
/// unaffected.
fn render_entry(key: &MessageKey, viewer: UserId, row: ConversationRow) -> ConversationEntry {
    let (body, verified) = match decrypt_message(key, &row.encrypted_body) {
        Ok(body) => (body, true),
        Err(e) => {
            warn!("Message {} failed to decrypt, serving stored plaintext: {}", row.id, e);
            (row.body, false)
        }
    };

    ConversationEntry {
        id: row.id,
        sender_id: row.sender_id,
        sender: row.sender_username,
        body,
        timestamp: row.timestamp,
        is_read: row.is_read,
        is_me: row.sender_id == viewer,
        verified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversations::{send_direct_message, send_group_message};
    use crate::identity::{touch_last_seen, update_profile};
    use crate::testutil;
    use chrono::Duration;
    use parley_crypto::derive_key;

    #[test]
    fn hello_scenario() {
        let db = testutil::db();
        let key = testutil::key();
        let a = testutil::user(&db, "alice");
        let b = testutil::user(&db, "bob");

        let sent = send_direct_message(&db, &key, a.id, b.id, "hello").unwrap();
        assert!(!sent.is_read);

        let from_a = get_conversation(&db, &key, a.id, b.id).unwrap();
        assert_eq!(from_a.len(), 1);
        assert_eq!(from_a[0].body, "hello");
        assert_eq!(from_a[0].sender, "alice");
        assert!(from_a[0].is_me);
        assert!(from_a[0].verified);
        assert_eq!(from_a[0].is_read, Some(false));

        let from_b = get_conversation(&db, &key, b.id, a.id).unwrap();
        assert!(!from_b[0].is_me);
    }

    #[test]
    fn conversation_is_ordered_and_symmetric() {
        let db = testutil::db();
        let key = testutil::key();
        let a = testutil::user(&db, "alice");
        let b = testutil::user(&db, "bob");
        let c = testutil::user(&db, "carol");

        send_direct_message(&db, &key, a.id, b.id, "one").unwrap();
        send_direct_message(&db, &key, b.id, a.id, "two").unwrap();
        send_direct_message(&db, &key, a.id, c.id, "elsewhere").unwrap();
        send_direct_message(&db, &key, a.id, b.id, "three").unwrap();

        let ab = get_conversation(&db, &key, a.id, b.id).unwrap();
        let ba = get_conversation(&db, &key, b.id, a.id).unwrap();

        let bodies: Vec<&str> = ab.iter().map(|e| e.body.as_str()).collect();
        assert_eq!(bodies, vec!["one", "two", "three"]);
        assert!(ab.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        let ids_ab: Vec<_> = ab.iter().map(|e| (e.id, e.timestamp)).collect();
        let ids_ba: Vec<_> = ba.iter().map(|e| (e.id, e.timestamp)).collect();
        assert_eq!(ids_ab, ids_ba);
    }

    #[test]
    fn reading_does_not_mark_read() {
        let db = testutil::db();
        let key = testutil::key();
        let a = testutil::user(&db, "alice");
        let b = testutil::user(&db, "bob");
        send_direct_message(&db, &key, a.id, b.id, "unread").unwrap();

        get_conversation(&db, &key, b.id, a.id).unwrap();
        assert_eq!(crate::conversations::unread_count(&db, b.id).unwrap(), 1);
    }

    #[test]
    fn undecryptable_message_falls_back_without_failing_siblings() {
        let db = testutil::db();
        let key = testutil::key();
        let a = testutil::user(&db, "alice");
        let b = testutil::user(&db, "bob");

        send_direct_message(&db, &key, a.id, b.id, "fine").unwrap();
        let other_key = derive_key(b"rotated-secret");
        send_direct_message(&db, &other_key, a.id, b.id, "sealed elsewhere").unwrap();
        send_direct_message(&db, &key, b.id, a.id, "also fine").unwrap();

        let entries = get_conversation(&db, &key, a.id, b.id).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].verified);
        assert!(!entries[1].verified);
        assert_eq!(entries[1].body, "sealed elsewhere");
        assert!(entries[2].verified);
        assert_eq!(entries[2].body, "also fine");
    }

    #[test]
    fn empty_search_does_not_touch_storage() {
        let db = testutil::db();
        let a = testutil::user(&db, "alice");

        // With the users table gone any query would fail.
        db.with_conn(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = OFF; DROP TABLE users;")?;
            Ok(())
        })
        .unwrap();

        assert!(search_users(&db, "", a.id).unwrap().is_empty());
        assert!(search_users(&db, "alice", a.id).is_err());
    }

    #[test]
    fn search_strips_at_and_matches_email() {
        let db = testutil::db();
        let me = testutil::user(&db, "viewer");
        testutil::user(&db, "alice");
        testutil::user(&db, "malice");
        testutil::user(&db, "bob");

        let plain = search_users(&db, "alice", me.id).unwrap();
        let at = search_users(&db, "@alice", me.id).unwrap();
        assert_eq!(plain, at);
        let names: Vec<&str> = plain.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "malice"]);

        let by_email = search_users(&db, "BOB@EXAMPLE", me.id).unwrap();
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].username, "bob");
    }

    #[test]
    fn search_excludes_requester_and_caps_results() {
        let db = testutil::db();
        let me = testutil::user(&db, "user_me");
        for i in 0..12 {
            testutil::user(&db, &format!("user_{:02}", i));
        }

        let hits = search_users(&db, "user", me.id).unwrap();
        assert_eq!(hits.len(), SEARCH_LIMIT as usize);
        assert!(hits.iter().all(|u| u.id != me.id));
    }

    #[test]
    fn friends_view_reports_profile_and_online_state() {
        let db = testutil::db();
        let config = ChatConfig::default();
        let a = testutil::user(&db, "alice");
        let b = testutil::user(&db, "bob");
        let c = testutil::user(&db, "carol");
        let now = Utc::now();

        update_profile(&db, b.id, Some("hi, I'm bob"), Some("bob.png")).unwrap();
        touch_last_seen(&db, b.id, now - Duration::minutes(1)).unwrap();
        touch_last_seen(&db, c.id, now - Duration::hours(2)).unwrap();

        for target in [b.id, c.id] {
            let edge = relationships::send_friend_request(&db, a.id, target).unwrap();
            relationships::accept_friend_request(&db, target, edge.id).unwrap();
        }

        let view = get_friends_view(&db, &config, a.id, now).unwrap();
        assert_eq!(
            view,
            vec![
                FriendSummary {
                    id: b.id,
                    username: "bob".into(),
                    avatar: "bob.png".into(),
                    about: "hi, I'm bob".into(),
                    online: true,
                },
                FriendSummary {
                    id: c.id,
                    username: "carol".into(),
                    avatar: "default.png".into(),
                    about: String::new(),
                    online: false,
                },
            ]
        );

        // Not symmetric: bob has no outgoing edge to alice.
        assert!(get_friends_view(&db, &config, b.id, now).unwrap().is_empty());
    }

    #[test]
    fn group_conversation_is_members_only() {
        let db = testutil::db();
        let key = testutil::key();
        let config = ChatConfig::default();
        let owner = testutil::user(&db, "owner");
        testutil::user(&db, "bob");
        let outsider = testutil::user(&db, "outsider");
        let group = groups::create_group(&db, owner.id, "g", "").unwrap();
        let bob = groups::add_member(&db, group.id, owner.id, "bob").unwrap();

        send_group_message(&db, &key, &config, owner.id, group.id, "first").unwrap();
        send_group_message(&db, &key, &config, bob.user_id, group.id, "second").unwrap();

        let entries = get_group_conversation(&db, &key, bob.user_id, group.id).unwrap();
        let bodies: Vec<&str> = entries.iter().map(|e| e.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
        assert!(!entries[0].is_me);
        assert!(entries[1].is_me);
        assert_eq!(entries[0].is_read, None);

        assert!(matches!(
            get_group_conversation(&db, &key, outsider.id, group.id),
            Err(ChatError::Forbidden(_))
        ));
        assert!(matches!(
            get_group_conversation(&db, &key, owner.id, 999_999),
            Err(ChatError::GroupNotFound(_))
        ));
    }
}
