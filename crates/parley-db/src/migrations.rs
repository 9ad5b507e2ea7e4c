use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const SCHEMA_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                username        TEXT NOT NULL UNIQUE COLLATE NOCASE,
                email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash   TEXT NOT NULL,
                about_me        TEXT NOT NULL DEFAULT '',
                avatar          TEXT NOT NULL DEFAULT 'default.png',
                last_seen       TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE friend_edges (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                requester_id    INTEGER NOT NULL REFERENCES users(id),
                target_id       INTEGER NOT NULL REFERENCES users(id),
                status          TEXT NOT NULL DEFAULT 'pending'
                                CHECK (status IN ('pending', 'accepted', 'blocked')),
                created_at      TEXT NOT NULL,
                UNIQUE(requester_id, target_id)
            );

            CREATE INDEX idx_friend_edges_target
                ON friend_edges(target_id, status);

            CREATE TABLE direct_messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                sender_id       INTEGER NOT NULL REFERENCES users(id),
                recipient_id    INTEGER NOT NULL REFERENCES users(id),
                body            TEXT NOT NULL,
                encrypted_body  BLOB NOT NULL,
                timestamp       TEXT NOT NULL,
                is_read         INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_direct_messages_pair
                ON direct_messages(sender_id, recipient_id, timestamp);

            CREATE INDEX idx_direct_messages_unread
                ON direct_messages(recipient_id, is_read);

            CREATE TABLE chat_groups (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                description     TEXT NOT NULL DEFAULT '',
                owner_id        INTEGER NOT NULL REFERENCES users(id),
                created_at      TEXT NOT NULL,
                avatar          TEXT NOT NULL DEFAULT 'group_default.png'
            );

            CREATE TABLE group_members (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id        INTEGER NOT NULL REFERENCES chat_groups(id),
                user_id         INTEGER NOT NULL REFERENCES users(id),
                role            TEXT NOT NULL DEFAULT 'member'
                                CHECK (role IN ('member', 'admin', 'owner')),
                joined_at       TEXT NOT NULL,
                UNIQUE(group_id, user_id)
            );

            CREATE INDEX idx_group_members_user
                ON group_members(user_id);

            CREATE TABLE group_messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id        INTEGER NOT NULL REFERENCES chat_groups(id),
                sender_id       INTEGER NOT NULL REFERENCES users(id),
                body            TEXT NOT NULL,
                encrypted_body  BLOB NOT NULL,
                timestamp       TEXT NOT NULL
            );

            CREATE INDEX idx_group_messages_group
                ON group_messages(group_id, timestamp);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete (schema v{})", SCHEMA_VERSION);
    Ok(())
}
