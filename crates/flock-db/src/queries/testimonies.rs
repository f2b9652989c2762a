use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use flock_types::models::{Testimony, TestimonyComment};

use crate::Database;
use crate::columns::{ts_col, uuid_col};
use crate::models::Toggle;

/// `?1` is always the viewer id, used for `liked_by_me`.
const TESTIMONY_SELECT: &str = "
    SELECT t.id, t.author_id, u.full_name, t.title, t.body, t.approved, t.likes_count,
           (SELECT COUNT(*) FROM testimony_comments c WHERE c.testimony_id = t.id),
           EXISTS (SELECT 1 FROM testimony_likes l WHERE l.testimony_id = t.id AND l.user_id = ?1),
           t.created_at
    FROM testimonies t
    JOIN users u ON u.id = t.author_id";

fn map_testimony(row: &Row<'_>) -> rusqlite::Result<Testimony> {
    Ok(Testimony {
        id: uuid_col(row, 0)?,
        author_id: uuid_col(row, 1)?,
        author_name: row.get(2)?,
        title: row.get(3)?,
        body: row.get(4)?,
        approved: row.get(5)?,
        likes_count: row.get(6)?,
        comments_count: row.get(7)?,
        liked_by_me: row.get(8)?,
        created_at: ts_col(row, 9)?,
    })
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<TestimonyComment> {
    Ok(TestimonyComment {
        id: uuid_col(row, 0)?,
        testimony_id: uuid_col(row, 1)?,
        author_id: uuid_col(row, 2)?,
        author_name: row.get(3)?,
        body: row.get(4)?,
        created_at: ts_col(row, 5)?,
    })
}

impl Database {
    pub fn create_testimony(
        &self,
        id: Uuid,
        author_id: Uuid,
        title: &str,
        body: &str,
        approved: bool,
    ) -> Result<Testimony> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO testimonies (id, author_id, title, body, approved)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id.to_string(), author_id.to_string(), title, body, approved],
            )?;
            Ok(())
        })?;
        self.get_testimony(id, author_id)?
            .ok_or_else(|| anyhow::anyhow!("testimony vanished after insert"))
    }

    pub fn get_testimony(&self, id: Uuid, viewer: Uuid) -> Result<Option<Testimony>> {
        self.with_conn(|conn| {
            let sql = format!("{TESTIMONY_SELECT} WHERE t.id = ?2");
            Ok(conn
                .query_row(&sql, params![viewer.to_string(), id.to_string()], map_testimony)
                .optional()?)
        })
    }

    /// Newest first. Unless `include_unapproved`, only approved testimonies and
    /// the viewer's own are returned.
    pub fn list_testimonies(&self, viewer: Uuid, include_unapproved: bool) -> Result<Vec<Testimony>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{TESTIMONY_SELECT}
                 WHERE ?2 OR t.approved = 1 OR t.author_id = ?1
                 ORDER BY t.created_at DESC, t.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![viewer.to_string(), include_unapproved], map_testimony)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_testimony_approved(&self, id: Uuid, approved: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE testimonies SET approved = ?2 WHERE id = ?1",
                params![id.to_string(), approved],
            )?;
            Ok(changed > 0)
        })
    }

    /// One like per user per testimony: likes if absent, unlikes if present.
    /// `None` when the testimony does not exist.
    pub fn toggle_testimony_like(&self, testimony_id: Uuid, user_id: Uuid) -> Result<Option<Toggle>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let tid = testimony_id.to_string();
            let uid = user_id.to_string();

            let exists = tx
                .query_row("SELECT 1 FROM testimonies WHERE id = ?1", [&tid], |_| Ok(()))
                .optional()?;
            if exists.is_none() {
                return Ok(None);
            }

            let removed = tx.execute(
                "DELETE FROM testimony_likes WHERE testimony_id = ?1 AND user_id = ?2",
                [&tid, &uid],
            )?;
            let active = removed == 0;
            if active {
                tx.execute(
                    "INSERT INTO testimony_likes (testimony_id, user_id) VALUES (?1, ?2)",
                    [&tid, &uid],
                )?;
            }
            tx.execute(
                "UPDATE testimonies SET likes_count = likes_count + ?2 WHERE id = ?1",
                params![&tid, if active { 1 } else { -1 }],
            )?;

            let count: i64 =
                tx.query_row("SELECT likes_count FROM testimonies WHERE id = ?1", [&tid], |r| {
                    r.get(0)
                })?;
            tx.commit()?;
            Ok(Some(Toggle { active, count }))
        })
    }

    // -- Comments --

    pub fn add_comment(
        &self,
        id: Uuid,
        testimony_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<TestimonyComment> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO testimony_comments (id, testimony_id, author_id, body)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id.to_string(), testimony_id.to_string(), author_id.to_string(), body],
            )?;
            let comment = conn.query_row(
                "SELECT c.id, c.testimony_id, c.author_id, u.full_name, c.body, c.created_at
                 FROM testimony_comments c JOIN users u ON u.id = c.author_id
                 WHERE c.id = ?1",
                [id.to_string()],
                map_comment,
            )?;
            Ok(comment)
        })
    }

    /// Oldest first, as a conversation reads.
    pub fn list_comments(&self, testimony_id: Uuid) -> Result<Vec<TestimonyComment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.testimony_id, c.author_id, u.full_name, c.body, c.created_at
                 FROM testimony_comments c JOIN users u ON u.id = c.author_id
                 WHERE c.testimony_id = ?1
                 ORDER BY c.created_at, c.rowid",
            )?;
            let rows = stmt
                .query_map([testimony_id.to_string()], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
