use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use flock_types::models::{Prayer, PrayerStatus};

use crate::Database;
use crate::columns::{enum_col, ts_col, uuid_col};
use crate::models::Toggle;

/// `?1` is always the viewer id, used for `supported_by_me`.
const PRAYER_SELECT: &str = "
    SELECT p.id, p.author_id, u.full_name, p.title, p.body, p.is_anonymous, p.status,
           p.support_count,
           EXISTS (SELECT 1 FROM prayer_supports s WHERE s.prayer_id = p.id AND s.user_id = ?1),
           p.created_at
    FROM prayers p
    JOIN users u ON u.id = p.author_id";

/// Author fields are always populated here; hiding them for anonymous
/// prayers is up to the caller.
fn map_prayer(row: &Row<'_>) -> rusqlite::Result<Prayer> {
    Ok(Prayer {
        id: uuid_col(row, 0)?,
        author_id: Some(uuid_col(row, 1)?),
        author_name: Some(row.get(2)?),
        title: row.get(3)?,
        body: row.get(4)?,
        is_anonymous: row.get(5)?,
        status: enum_col(row, 6)?,
        support_count: row.get(7)?,
        supported_by_me: row.get(8)?,
        created_at: ts_col(row, 9)?,
    })
}

impl Database {
    pub fn create_prayer(
        &self,
        id: Uuid,
        author_id: Uuid,
        title: &str,
        body: &str,
        is_anonymous: bool,
    ) -> Result<Prayer> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO prayers (id, author_id, title, body, is_anonymous, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.to_string(),
                    author_id.to_string(),
                    title,
                    body,
                    is_anonymous,
                    PrayerStatus::Open.as_str(),
                ],
            )?;
            Ok(())
        })?;
        self.get_prayer(id, author_id)?
            .ok_or_else(|| anyhow::anyhow!("prayer vanished after insert"))
    }

    pub fn get_prayer(&self, id: Uuid, viewer: Uuid) -> Result<Option<Prayer>> {
        self.with_conn(|conn| {
            let sql = format!("{PRAYER_SELECT} WHERE p.id = ?2");
            Ok(conn
                .query_row(&sql, params![viewer.to_string(), id.to_string()], map_prayer)
                .optional()?)
        })
    }

    /// Newest first.
    pub fn list_prayers(&self, status: Option<PrayerStatus>, viewer: Uuid) -> Result<Vec<Prayer>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{PRAYER_SELECT}
                 WHERE ?2 IS NULL OR p.status = ?2
                 ORDER BY p.created_at DESC, p.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![viewer.to_string(), status.map(|s| s.as_str())],
                    map_prayer,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_prayer_status(&self, id: Uuid, status: PrayerStatus) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE prayers SET status = ?2 WHERE id = ?1",
                params![id.to_string(), status.as_str()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Adds the user's support if absent, removes it if present, and keeps
    /// `support_count` in step. `None` when the prayer does not exist.
    pub fn toggle_prayer_support(&self, prayer_id: Uuid, user_id: Uuid) -> Result<Option<Toggle>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let pid = prayer_id.to_string();
            let uid = user_id.to_string();

            let exists = tx
                .query_row("SELECT 1 FROM prayers WHERE id = ?1", [&pid], |_| Ok(()))
                .optional()?;
            if exists.is_none() {
                return Ok(None);
            }

            let removed = tx.execute(
                "DELETE FROM prayer_supports WHERE prayer_id = ?1 AND user_id = ?2",
                [&pid, &uid],
            )?;
            let active = if removed > 0 {
                tx.execute(
                    "UPDATE prayers SET support_count = support_count - 1 WHERE id = ?1",
                    [&pid],
                )?;
                false
            } else {
                tx.execute(
                    "INSERT INTO prayer_supports (prayer_id, user_id) VALUES (?1, ?2)",
                    [&pid, &uid],
                )?;
                tx.execute(
                    "UPDATE prayers SET support_count = support_count + 1 WHERE id = ?1",
                    [&pid],
                )?;
                true
            };

            let count: i64 =
                tx.query_row("SELECT support_count FROM prayers WHERE id = ?1", [&pid], |r| {
                    r.get(0)
                })?;
            tx.commit()?;
            Ok(Some(Toggle { active, count }))
        })
    }
}
