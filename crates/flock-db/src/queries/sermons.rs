use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use flock_types::models::Sermon;

use crate::Database;
use crate::columns::{date_col, ts_col, uuid_col};

const SERMON_COLUMNS: &str =
    "id, title, speaker, series, scripture, media_url, preached_on, created_at";

fn map_sermon(row: &Row<'_>) -> rusqlite::Result<Sermon> {
    Ok(Sermon {
        id: uuid_col(row, 0)?,
        title: row.get(1)?,
        speaker: row.get(2)?,
        series: row.get(3)?,
        scripture: row.get(4)?,
        media_url: row.get(5)?,
        preached_on: date_col(row, 6)?,
        created_at: ts_col(row, 7)?,
    })
}

impl Database {
    pub fn create_sermon(&self, sermon: &Sermon) -> Result<Sermon> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sermons (id, title, speaker, series, scripture, media_url, preached_on)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    sermon.id.to_string(),
                    sermon.title,
                    sermon.speaker,
                    sermon.series,
                    sermon.scripture,
                    sermon.media_url,
                    sermon.preached_on.format("%Y-%m-%d").to_string(),
                ],
            )?;
            Ok(())
        })?;
        self.get_sermon(sermon.id)?
            .ok_or_else(|| anyhow::anyhow!("sermon vanished after insert"))
    }

    pub fn get_sermon(&self, id: Uuid) -> Result<Option<Sermon>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {SERMON_COLUMNS} FROM sermons WHERE id = ?1");
            Ok(conn.query_row(&sql, [id.to_string()], map_sermon).optional()?)
        })
    }

    /// Most recently preached first.
    pub fn list_sermons(&self, series: Option<&str>, speaker: Option<&str>) -> Result<Vec<Sermon>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {SERMON_COLUMNS} FROM sermons
                 WHERE (?1 IS NULL OR series = ?1 COLLATE NOCASE)
                   AND (?2 IS NULL OR speaker = ?2 COLLATE NOCASE)
                 ORDER BY preached_on DESC, title"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![series, speaker], map_sermon)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_sermon(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM sermons WHERE id = ?1", [id.to_string()])?;
            Ok(changed > 0)
        })
    }
}
