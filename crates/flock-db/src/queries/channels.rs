use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use flock_types::models::{Channel, Message};

use crate::Database;
use crate::columns::{ts_col, uuid_col};
use crate::models::MessageCursor;

const MESSAGE_SELECT: &str = "
    SELECT m.id, m.channel_id, m.author_id, u.full_name, m.body, m.created_at
    FROM messages m
    JOIN users u ON u.id = m.author_id";

fn map_channel(row: &Row<'_>) -> rusqlite::Result<Channel> {
    Ok(Channel {
        id: uuid_col(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: ts_col(row, 3)?,
    })
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: uuid_col(row, 0)?,
        channel_id: uuid_col(row, 1)?,
        author_id: uuid_col(row, 2)?,
        author_name: row.get(3)?,
        body: row.get(4)?,
        created_at: ts_col(row, 5)?,
    })
}

impl Database {
    // -- Channels --

    pub fn create_channel(&self, id: Uuid, name: &str, description: Option<&str>) -> Result<Channel> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO channels (id, name, description) VALUES (?1, ?2, ?3)",
                params![id.to_string(), name, description],
            )?;
            Ok(())
        })?;
        self.get_channel(id)?
            .ok_or_else(|| anyhow::anyhow!("channel vanished after insert"))
    }

    pub fn get_channel(&self, id: Uuid) -> Result<Option<Channel>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, name, description, created_at FROM channels WHERE id = ?1",
                    [id.to_string()],
                    map_channel,
                )
                .optional()?)
        })
    }

    pub fn get_channel_by_name(&self, name: &str) -> Result<Option<Channel>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, name, description, created_at FROM channels WHERE name = ?1",
                    [name],
                    map_channel,
                )
                .optional()?)
        })
    }

    pub fn list_channels(&self) -> Result<Vec<Channel>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, name, description, created_at FROM channels ORDER BY name")?;
            let rows = stmt
                .query_map([], map_channel)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, id: Uuid, channel_id: Uuid, author_id: Uuid, body: &str) -> Result<Message> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, channel_id, author_id, body) VALUES (?1, ?2, ?3, ?4)",
                params![id.to_string(), channel_id.to_string(), author_id.to_string(), body],
            )?;
            let sql = format!("{MESSAGE_SELECT} WHERE m.id = ?1");
            Ok(conn.query_row(&sql, [id.to_string()], map_message)?)
        })
    }

    /// Cursor for paging past `message_id`, if it belongs to `channel_id`.
    pub fn message_cursor(&self, channel_id: Uuid, message_id: Uuid) -> Result<Option<MessageCursor>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT created_at, rowid FROM messages WHERE id = ?1 AND channel_id = ?2",
                    [message_id.to_string(), channel_id.to_string()],
                    |row| Ok(MessageCursor { created_at: row.get(0)?, rowid: row.get(1)? }),
                )
                .optional()?)
        })
    }

    /// Newest first, ordered by `(created_at, rowid)` so messages sharing a
    /// second still page deterministically.
    pub fn get_messages(
        &self,
        channel_id: Uuid,
        limit: u32,
        before: Option<&MessageCursor>,
    ) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{MESSAGE_SELECT}
                 WHERE m.channel_id = ?1
                   AND (?2 IS NULL OR m.created_at < ?2 OR (m.created_at = ?2 AND m.rowid < ?3))
                 ORDER BY m.created_at DESC, m.rowid DESC
                 LIMIT ?4"
            );
            let (ts, rowid) = match before {
                Some(c) => (Some(c.created_at.as_str()), c.rowid),
                None => (None, 0),
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![channel_id.to_string(), ts, rowid, limit], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
