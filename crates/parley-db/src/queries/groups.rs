use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use super::OptionalExt;
use crate::Database;
use crate::models::{GROUP_COLUMNS, GroupMemberRow, GroupRow, MEMBER_COLUMNS};

/// Outcome of a membership insert.
pub enum NewMember {
    Joined(GroupMemberRow),
    AlreadyMember(GroupMemberRow),
}

impl Database {
    // -- Groups --

    /// Create a group and its owner's membership in one transaction.
    pub fn create_group(
        &self,
        name: &str,
        description: &str,
        owner_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(GroupRow, GroupMemberRow)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO chat_groups (name, description, owner_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![name, description, owner_id, now],
            )?;
            let group_id = tx.last_insert_rowid();

            tx.execute(
                "INSERT INTO group_members (group_id, user_id, role, joined_at)
                 VALUES (?1, ?2, 'owner', ?3)",
                params![group_id, owner_id, now],
            )?;

            let group = query_group(&tx, group_id)?
                .ok_or_else(|| anyhow!("Group {} vanished after insert", group_id))?;
            let owner = query_member(&tx, group_id, owner_id)?
                .ok_or_else(|| anyhow!("Owner membership for group {} missing", group_id))?;

            tx.commit()?;
            Ok((group, owner))
        })
    }

    pub fn get_group(&self, id: i64) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| query_group(conn, id))
    }

    pub fn insert_group_member(
        &self,
        group_id: i64,
        user_id: i64,
        role: &str,
        now: DateTime<Utc>,
    ) -> Result<NewMember> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let inserted = tx.execute(
                "INSERT INTO group_members (group_id, user_id, role, joined_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (group_id, user_id) DO NOTHING",
                params![group_id, user_id, role, now],
            )?;

            let row = query_member(&tx, group_id, user_id)?
                .ok_or_else(|| anyhow!("Membership {}/{} missing", group_id, user_id))?;
            tx.commit()?;

            Ok(if inserted == 0 {
                NewMember::AlreadyMember(row)
            } else {
                NewMember::Joined(row)
            })
        })
    }

    pub fn get_group_member(&self, group_id: i64, user_id: i64) -> Result<Option<GroupMemberRow>> {
        self.with_conn(|conn| query_member(conn, group_id, user_id))
    }

    /// Compare-and-set a member's role. Returns false when the member is
    /// not currently in `from`.
    pub fn update_member_role(
        &self,
        group_id: i64,
        user_id: i64,
        from: &str,
        to: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE group_members SET role = ?4
                 WHERE group_id = ?1 AND user_id = ?2 AND role = ?3",
                params![group_id, user_id, from, to],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn list_group_members(&self, group_id: i64) -> Result<Vec<GroupMemberRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MEMBER_COLUMNS} FROM group_members
                 WHERE group_id = ?1
                 ORDER BY joined_at, id"
            );
            let mut stmt = conn.prepare(&sql)?;

            let rows = stmt
                .query_map([group_id], GroupMemberRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Groups the user belongs to, oldest membership first.
    pub fn list_groups_for_user(&self, user_id: i64) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT g.id, g.name, g.description, g.owner_id, g.created_at, g.avatar
                 FROM chat_groups g
                 JOIN group_members m ON m.group_id = g.id
                 WHERE m.user_id = ?1
                 ORDER BY m.joined_at, g.id",
            )?;

            let rows = stmt
                .query_map([user_id], GroupRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn query_group(conn: &Connection, id: i64) -> Result<Option<GroupRow>> {
    let sql = format!("SELECT {GROUP_COLUMNS} FROM chat_groups WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;

    stmt.query_row([id], GroupRow::from_row).optional()
}

fn query_member(conn: &Connection, group_id: i64, user_id: i64) -> Result<Option<GroupMemberRow>> {
    let sql = format!(
        "SELECT {MEMBER_COLUMNS} FROM group_members WHERE group_id = ?1 AND user_id = ?2"
    );
    let mut stmt = conn.prepare(&sql)?;

    stmt.query_row([group_id, user_id], GroupMemberRow::from_row).optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::NewUser;

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
    fn create_group_adds_owner_membership() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "owner");

        let (group, membership) = db
            .create_group("Rustaceans", "crabs only", owner, Utc::now())
            .unwrap();
        assert_eq!(group.owner_id, owner);
        assert_eq!(group.avatar, "group_default.png");
        assert_eq!(membership.role, "owner");
        assert_eq!(membership.user_id, owner);

        assert_eq!(db.list_groups_for_user(owner).unwrap().len(), 1);
    }

    #[test]
    fn one_membership_per_group_and_user() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "owner");
        let bob = user(&db, "bob");
        let (group, _) = db.create_group("g", "", owner, Utc::now()).unwrap();

        assert!(matches!(
            db.insert_group_member(group.id, bob, "member", Utc::now()).unwrap(),
            NewMember::Joined(_)
        ));
        assert!(matches!(
            db.insert_group_member(group.id, bob, "admin", Utc::now()).unwrap(),
            NewMember::AlreadyMember(ref row) if row.role == "member"
        ));

        let members = db.list_group_members(group.id).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].user_id, owner);
        assert_eq!(members[1].user_id, bob);
    }

    #[test]
    fn role_update_is_compare_and_set() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "owner");
        let bob = user(&db, "bob");
        let (group, _) = db.create_group("g", "", owner, Utc::now()).unwrap();
        db.insert_group_member(group.id, bob, "member", Utc::now()).unwrap();

        assert!(!db.update_member_role(group.id, bob, "admin", "member").unwrap());
        assert!(db.update_member_role(group.id, bob, "member", "admin").unwrap());
        assert_eq!(db.get_group_member(group.id, bob).unwrap().unwrap().role, "admin");
    }

    #[test]
    fn group_requires_existing_owner() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_group("g", "", 42, Utc::now()).is_err());
        assert!(db.get_group(1).unwrap().is_none());
    }
}
