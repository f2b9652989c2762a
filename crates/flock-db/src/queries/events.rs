use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use flock_types::models::Event;

use crate::Database;
use crate::columns::{format_ts, opt_ts_col, opt_uuid_col, ts_col, uuid_col};

const EVENT_COLUMNS: &str =
    "id, title, description, category, location, starts_at, ends_at, created_by, created_at";

fn map_event(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: uuid_col(row, 0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        location: row.get(4)?,
        starts_at: ts_col(row, 5)?,
        ends_at: opt_ts_col(row, 6)?,
        created_by: opt_uuid_col(row, 7)?,
        created_at: ts_col(row, 8)?,
    })
}

impl Database {
    /// Inserts `event`; `created_at` is assigned by the database.
    pub fn create_event(&self, event: &Event) -> Result<Event> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO events (id, title, description, category, location, starts_at, ends_at, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    event.id.to_string(),
                    event.title,
                    event.description,
                    event.category,
                    event.location,
                    format_ts(&event.starts_at),
                    event.ends_at.as_ref().map(format_ts),
                    event.created_by.map(|u| u.to_string()),
                ],
            )?;
            Ok(())
        })?;
        self.get_event(event.id)?
            .ok_or_else(|| anyhow::anyhow!("event vanished after insert"))
    }

    pub fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1");
            Ok(conn.query_row(&sql, [id.to_string()], map_event).optional()?)
        })
    }

    /// Ordered by start time. `category` matches case-insensitively; `starting_after`
    /// keeps events that start at or after the given instant.
    pub fn list_events(
        &self,
        category: Option<&str>,
        starting_after: Option<&DateTime<Utc>>,
    ) -> Result<Vec<Event>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {EVENT_COLUMNS} FROM events
                 WHERE (?1 IS NULL OR category = ?1 COLLATE NOCASE)
                   AND (?2 IS NULL OR starts_at >= ?2)
                 ORDER BY starts_at"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![category, starting_after.map(format_ts)], map_event)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Overwrites every editable column with the values in `event`.
    pub fn update_event(&self, event: &Event) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE events
                 SET title = ?2, description = ?3, category = ?4, location = ?5,
                     starts_at = ?6, ends_at = ?7
                 WHERE id = ?1",
                params![
                    event.id.to_string(),
                    event.title,
                    event.description,
                    event.category,
                    event.location,
                    format_ts(&event.starts_at),
                    event.ends_at.as_ref().map(format_ts),
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Attendance rows go with the event.
    pub fn delete_event(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM events WHERE id = ?1", [id.to_string()])?;
            Ok(changed > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{db, user};
    use chrono::Duration;
    use flock_types::models::Role;

    fn event(title: &str, category: &str, starts_at: DateTime<Utc>, by: Uuid) -> Event {
        Event {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            category: category.into(),
            location: Some("Main hall".into()),
            starts_at,
            ends_at: None,
            created_by: Some(by),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn upcoming_and_category_filters() {
        let db = db();
        let staff = user(&db, "Martha", Role::Staff);
        let now = Utc::now();
        db.create_event(&event("Past supper", "fellowship", now - Duration::days(3), staff)).unwrap();
        db.create_event(&event("Youth night", "Youth", now + Duration::days(2), staff)).unwrap();
        db.create_event(&event("Potluck", "fellowship", now + Duration::days(1), staff)).unwrap();

        let upcoming = db.list_events(None, Some(&now)).unwrap();
        let titles: Vec<_> = upcoming.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["Potluck", "Youth night"]);

        let youth = db.list_events(Some("youth"), None).unwrap();
        assert_eq!(youth.len(), 1);
        assert_eq!(db.list_events(Some("fellowship"), None).unwrap().len(), 2);
    }

    #[test]
    fn deleting_the_creator_keeps_the_event() {
        let db = db();
        let staff = user(&db, "Martha", Role::Staff);
        let created = db.create_event(&event("Choir", "music", Utc::now(), staff)).unwrap();
        db.delete_user(staff).unwrap();

        let kept = db.get_event(created.id).unwrap().unwrap();
        assert_eq!(kept.created_by, None);
        assert!(db.delete_event(created.id).unwrap());
        assert!(db.get_event(created.id).unwrap().is_none());
    }
}
