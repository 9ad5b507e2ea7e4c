use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use super::{OptionalExt, like_substring};
use crate::Database;
use crate::models::{USER_COLUMNS, UserRow};

/// Outcome of a registration insert.
pub enum NewUser {
    Created(UserRow),
    UsernameTaken,
    EmailTaken,
}

impl Database {
    // -- Users --

    /// Insert a user. Uniqueness is checked and the row written under one
    /// transaction, so two registrations cannot both claim a name.
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<NewUser> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let username_taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
                [username],
                |row| row.get(0),
            )?;
            if username_taken {
                return Ok(NewUser::UsernameTaken);
            }

            let email_taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
                [email],
                |row| row.get(0),
            )?;
            if email_taken {
                return Ok(NewUser::EmailTaken);
            }

            tx.execute(
                "INSERT INTO users (username, email, password_hash, last_seen, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![username, email, password_hash, now],
            )?;
            let id = tx.last_insert_rowid();
            let row = query_user_by_id(&tx, id)?
                .ok_or_else(|| anyhow!("User {} vanished after insert", id))?;

            tx.commit()?;
            Ok(NewUser::Created(row))
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by(conn, "email", email))
    }

    pub fn user_exists(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
                [id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Case-insensitive substring match on username or email, skipping
    /// `excluding`. Wildcards in `needle` match literally.
    pub fn search_users(&self, needle: &str, excluding: i64, limit: u32) -> Result<Vec<UserRow>> {
        let pattern = like_substring(needle);

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE (username LIKE ?1 ESCAPE '\\' OR email LIKE ?1 ESCAPE '\\')
                   AND id != ?2
                 ORDER BY username, id
                 LIMIT ?3"
            );
            let mut stmt = conn.prepare(&sql)?;

            let rows = stmt
                .query_map(params![pattern, excluding, limit], |row| UserRow::from_row(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Update whichever profile fields are given. Returns the updated row,
    /// or `None` when the user does not exist.
    pub fn update_profile(
        &self,
        id: i64,
        about_me: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users
                 SET about_me = COALESCE(?2, about_me),
                     avatar = COALESCE(?3, avatar)
                 WHERE id = ?1",
                params![id, about_me, avatar],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_user_by_id(conn, id)
        })
    }

    /// Refresh `last_seen`. Returns false when the user does not exist.
    pub fn touch_last_seen(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET last_seen = ?2 WHERE id = ?1",
                params![id, at],
            )?;
            Ok(changed > 0)
        })
    }
}

pub(crate) fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;

    stmt.query_row([id], |row| UserRow::from_row(row, 0)).optional()
}

fn query_user_by(conn: &Connection, column: &'static str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    stmt.query_row([value], |row| UserRow::from_row(row, 0)).optional()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(db: &Database, username: &str, email: &str) -> UserRow {
        match db.create_user(username, email, "hash", Utc::now()).unwrap() {
            NewUser::Created(row) => row,
            _ => panic!("expected {} to be created", username),
        }
    }

    #[test]
    fn create_and_lookup() {
        let db = Database::open_in_memory().unwrap();
        let alice = create(&db, "alice", "alice@example.com");

        assert_eq!(alice.avatar, "default.png");
        assert_eq!(alice.about_me, "");
        assert_eq!(db.get_user_by_id(alice.id).unwrap().unwrap().username, "alice");
        assert_eq!(db.get_user_by_username("ALICE").unwrap().unwrap().id, alice.id);
        assert_eq!(db.get_user_by_email("alice@example.com").unwrap().unwrap().id, alice.id);
        assert!(db.get_user_by_id(999_999).unwrap().is_none());
        assert!(db.user_exists(alice.id).unwrap());
        assert!(!db.user_exists(999_999).unwrap());
    }

    #[test]
    fn duplicate_username_and_email_are_reported() {
        let db = Database::open_in_memory().unwrap();
        create(&db, "alice", "alice@example.com");

        assert!(matches!(
            db.create_user("Alice", "other@example.com", "hash", Utc::now()).unwrap(),
            NewUser::UsernameTaken
        ));
        assert!(matches!(
            db.create_user("alicia", "ALICE@example.com", "hash", Utc::now()).unwrap(),
            NewUser::EmailTaken
        ));
    }

    #[test]
    fn search_treats_wildcards_literally() {
        let db = Database::open_in_memory().unwrap();
        let me = create(&db, "me", "me@example.com");
        create(&db, "under_score", "u@example.com");
        create(&db, "underXscore", "x@example.com");

        let hits = db.search_users("r_s", me.id, 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].username, "under_score");
    }

    #[test]
    fn profile_update_keeps_unset_fields() {
        let db = Database::open_in_memory().unwrap();
        let alice = create(&db, "alice", "alice@example.com");

        let updated = db.update_profile(alice.id, Some("hi there"), None).unwrap().unwrap();
        assert_eq!(updated.about_me, "hi there");
        assert_eq!(updated.avatar, "default.png");

        assert!(db.update_profile(999_999, Some("x"), None).unwrap().is_none());
    }
}
