use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::params;

use super::OptionalExt;
use crate::Database;
use crate::models::{ConversationRow, DirectMessageRow, GroupMessageRow};

impl Database {
    // -- Direct messages --

    /// Persist a direct message. Plaintext and encrypted body land in the
    /// same row under one transaction.
    pub fn insert_direct_message(
        &self,
        sender_id: i64,
        recipient_id: i64,
        body: &str,
        encrypted_body: &[u8],
        at: DateTime<Utc>,
    ) -> Result<DirectMessageRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO direct_messages
                     (sender_id, recipient_id, body, encrypted_body, timestamp, is_read)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0)",
                params![sender_id, recipient_id, body, encrypted_body, at],
            )?;
            let id = tx.last_insert_rowid();

            tx.commit()?;
            Ok(DirectMessageRow {
                id,
                sender_id,
                recipient_id,
                body: body.to_string(),
                encrypted_body: encrypted_body.to_vec(),
                timestamp: at,
                is_read: false,
            })
        })
    }

    pub fn get_direct_message(&self, id: i64) -> Result<Option<DirectMessageRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, sender_id, recipient_id, body, encrypted_body, timestamp, is_read
                 FROM direct_messages WHERE id = ?1",
                [id],
                |row| {
                    Ok(DirectMessageRow {
                        id: row.get(0)?,
                        sender_id: row.get(1)?,
                        recipient_id: row.get(2)?,
                        body: row.get(3)?,
                        encrypted_body: row.get(4)?,
                        timestamp: row.get(5)?,
                        is_read: row.get(6)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn mark_direct_message_read(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let changed =
                conn.execute("UPDATE direct_messages SET is_read = 1 WHERE id = ?1", [id])?;
            if changed == 0 {
                return Err(anyhow!("Direct message {} not found", id));
            }
            Ok(())
        })
    }

    pub fn count_unread_direct_messages(&self, recipient_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM direct_messages WHERE recipient_id = ?1 AND is_read = 0",
                [recipient_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Every message between `a` and `b`, in either direction, oldest first.
    pub fn list_direct_conversation(&self, a: i64, b: i64) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            // JOIN users to fetch the sender's username in a single query (no N+1)
            let mut stmt = conn.prepare(
                "SELECT m.id, m.sender_id, u.username, m.body, m.encrypted_body,
                        m.timestamp, m.is_read
                 FROM direct_messages m
                 JOIN users u ON u.id = m.sender_id
                 WHERE (m.sender_id = ?1 AND m.recipient_id = ?2)
                    OR (m.sender_id = ?2 AND m.recipient_id = ?1)
                 ORDER BY m.timestamp ASC, m.id ASC",
            )?;

            let rows = stmt
                .query_map(params![a, b], |row| {
                    Ok(ConversationRow {
                        id: row.get(0)?,
                        sender_id: row.get(1)?,
                        sender_username: row.get(2)?,
                        body: row.get(3)?,
                        encrypted_body: row.get(4)?,
                        timestamp: row.get(5)?,
                        is_read: Some(row.get(6)?),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Group messages --

    pub fn insert_group_message(
        &self,
        group_id: i64,
        sender_id: i64,
        body: &str,
        encrypted_body: &[u8],
        at: DateTime<Utc>,
    ) -> Result<GroupMessageRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO group_messages (group_id, sender_id, body, encrypted_body, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![group_id, sender_id, body, encrypted_body, at],
            )?;
            let id = tx.last_insert_rowid();

            tx.commit()?;
            Ok(GroupMessageRow {
                id,
                group_id,
                sender_id,
                body: body.to_string(),
                encrypted_body: encrypted_body.to_vec(),
                timestamp: at,
            })
        })
    }

    pub fn list_group_conversation(&self, group_id: i64) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.sender_id, u.username, m.body, m.encrypted_body, m.timestamp
                 FROM group_messages m
                 JOIN users u ON u.id = m.sender_id
                 WHERE m.group_id = ?1
                 ORDER BY m.timestamp ASC, m.id ASC",
            )?;

            let rows = stmt
                .query_map([group_id], |row| {
                    Ok(ConversationRow {
                        id: row.get(0)?,
                        sender_id: row.get(1)?,
                        sender_username: row.get(2)?,
                        body: row.get(3)?,
                        encrypted_body: row.get(4)?,
                        timestamp: row.get(5)?,
                        is_read: None,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::NewUser;
    use chrono::Duration;

    fn user(db: &Database, name: &str) -> i64 {
        match db
            .create_user(name, &format!("{}@example.com", name), "hash", Utc::now())
            .unwrap()
        {
            NewUser::Created(row) => row.id,
            _ => panic!("duplicate user {}", name),
        }
    }

    #[test]
    fn conversation_orders_by_timestamp_not_insertion() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "alice");
        let b = user(&db, "bob");
        let base = Utc::now();

        let late = db
            .insert_direct_message(a, b, "second", b"x", base + Duration::seconds(5))
            .unwrap();
        let early = db.insert_direct_message(b, a, "first", b"y", base).unwrap();

        let rows = db.list_direct_conversation(a, b).unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
        assert_eq!(rows[0].sender_username, "bob");
        assert_eq!(rows[0].is_read, Some(false));
    }

    #[test]
    fn sub_second_timestamps_keep_their_order() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "alice");
        let b = user(&db, "bob");
        let base = Utc::now();

        let later = db
            .insert_direct_message(a, b, "b", b"x", base + Duration::milliseconds(250))
            .unwrap();
        let earlier = db
            .insert_direct_message(a, b, "a", b"x", base + Duration::milliseconds(5))
            .unwrap();

        let rows = db.list_direct_conversation(b, a).unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![earlier.id, later.id]);
    }

    #[test]
    fn conversation_excludes_third_parties() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "alice");
        let b = user(&db, "bob");
        let c = user(&db, "carol");
        db.insert_direct_message(a, b, "hi bob", b"x", Utc::now()).unwrap();
        db.insert_direct_message(a, c, "hi carol", b"x", Utc::now()).unwrap();

        let rows = db.list_direct_conversation(a, b).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].body, "hi bob");
    }

    #[test]
    fn read_flag_and_unread_count() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "alice");
        let b = user(&db, "bob");
        let msg = db.insert_direct_message(a, b, "ping", b"x", Utc::now()).unwrap();
        db.insert_direct_message(a, b, "ping again", b"x", Utc::now()).unwrap();

        assert_eq!(db.count_unread_direct_messages(b).unwrap(), 2);
        db.mark_direct_message_read(msg.id).unwrap();
        assert!(db.get_direct_message(msg.id).unwrap().unwrap().is_read);
        assert_eq!(db.count_unread_direct_messages(b).unwrap(), 1);
        assert_eq!(db.count_unread_direct_messages(a).unwrap(), 0);

        assert!(db.mark_direct_message_read(999_999).is_err());
    }

    #[test]
    fn message_to_missing_user_is_rejected_by_schema() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "alice");

        assert!(db.insert_direct_message(a, 999_999, "void", b"x", Utc::now()).is_err());
        assert!(db.list_direct_conversation(a, 999_999).unwrap().is_empty());
    }

    #[test]
    fn group_conversation_has_no_read_flag() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "alice");
        let (group, _) = db.create_group("g", "", a, Utc::now()).unwrap();

        db.insert_group_message(group.id, a, "hello group", b"x", Utc::now()).unwrap();
        let rows = db.list_group_conversation(group.id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].is_read, None);
        assert_eq!(rows[0].sender_username, "alice");
    }
}
