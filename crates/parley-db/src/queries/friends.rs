use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use super::OptionalExt;
use crate::Database;
use crate::models::{EDGE_COLUMNS, FriendEdgeRow, USER_COLUMNS, UserRow};

/// Outcome of a friend-request insert.
pub enum NewEdge {
    Created(FriendEdgeRow),
    /// An edge for this ordered pair already exists.
    Exists(FriendEdgeRow),
}

impl Database {
    // -- Friend edges --

    pub fn insert_friend_edge(
        &self,
        requester_id: i64,
        target_id: i64,
        now: DateTime<Utc>,
    ) -> Result<NewEdge> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let inserted = tx.execute(
                "INSERT INTO friend_edges (requester_id, target_id, status, created_at)
                 VALUES (?1, ?2, 'pending', ?3)
                 ON CONFLICT (requester_id, target_id) DO NOTHING",
                params![requester_id, target_id, now],
            )?;

            let row = query_edge_by_pair(&tx, requester_id, target_id)?
                .ok_or_else(|| anyhow!("Friend edge {} -> {} missing", requester_id, target_id))?;
            tx.commit()?;

            Ok(if inserted == 0 {
                NewEdge::Exists(row)
            } else {
                NewEdge::Created(row)
            })
        })
    }

    pub fn get_friend_edge(&self, id: i64) -> Result<Option<FriendEdgeRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {EDGE_COLUMNS} FROM friend_edges WHERE id = ?1");
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_row([id], |row| FriendEdgeRow::from_row(row, 0)).optional()
        })
    }

    pub fn find_friend_edge(
        &self,
        requester_id: i64,
        target_id: i64,
    ) -> Result<Option<FriendEdgeRow>> {
        self.with_conn(|conn| query_edge_by_pair(conn, requester_id, target_id))
    }

    /// Compare-and-set the status of an edge. Returns false when the edge
    /// is not currently in `from`.
    pub fn update_friend_status(&self, id: i64, from: &str, to: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE friend_edges SET status = ?3 WHERE id = ?1 AND status = ?2",
                params![id, from, to],
            )?;
            Ok(changed > 0)
        })
    }

    /// Edges `user -> *` with the given status, joined with the target user.
    pub fn list_outgoing_edges(
        &self,
        user_id: i64,
        status: &str,
    ) -> Result<Vec<(UserRow, FriendEdgeRow)>> {
        self.with_conn(|conn| {
            query_edges_with_user(conn, "requester_id", "target_id", user_id, status)
        })
    }

    /// Edges `* -> user` with the given status, joined with the requester.
    pub fn list_incoming_edges(
        &self,
        user_id: i64,
        status: &str,
    ) -> Result<Vec<(UserRow, FriendEdgeRow)>> {
        self.with_conn(|conn| {
            query_edges_with_user(conn, "target_id", "requester_id", user_id, status)
        })
    }
}

fn query_edge_by_pair(
    conn: &Connection,
    requester_id: i64,
    target_id: i64,
) -> Result<Option<FriendEdgeRow>> {
    let sql = format!(
        "SELECT {EDGE_COLUMNS} FROM friend_edges WHERE requester_id = ?1 AND target_id = ?2"
    );
    let mut stmt = conn.prepare(&sql)?;

    stmt.query_row(params![requester_id, target_id], |row| FriendEdgeRow::from_row(row, 0))
        .optional()
}

/// `anchor` is the column matched against `user_id`; `other` is the column
/// joined to `users` for the returned profile.
fn query_edges_with_user(
    conn: &Connection,
    anchor: &'static str,
    other: &'static str,
    user_id: i64,
    status: &str,
) -> Result<Vec<(UserRow, FriendEdgeRow)>> {
    let user_cols = prefixed("u", USER_COLUMNS);
    let edge_cols = prefixed("e", EDGE_COLUMNS);
    let sql = format!(
        "SELECT {user_cols}, {edge_cols}
         FROM friend_edges e
         JOIN users u ON u.id = e.{other}
         WHERE e.{anchor} = ?1 AND e.status = ?2
         ORDER BY e.created_at, e.id"
    );
    let mut stmt = conn.prepare(&sql)?;

    let user_width = USER_COLUMNS.split(',').count();
    let rows = stmt
        .query_map(params![user_id, status], |row| {
            Ok((
                UserRow::from_row(row, 0)?,
                FriendEdgeRow::from_row(row, user_width)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn prefixed(alias: &str, columns: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
