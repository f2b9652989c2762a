use anyhow::Result;
use rusqlite::{Row, params};
use uuid::Uuid;

use flock_types::api::EventAttendanceStats;
use flock_types::models::{Attendance, AttendanceMethod};

use crate::Database;
use crate::columns::{enum_col, ts_col, uuid_col};

const ATTENDANCE_SELECT: &str = "
    SELECT a.id, a.event_id, a.user_id, u.full_name, a.method, a.confidence, a.checked_in_at
    FROM attendance a
    JOIN users u ON u.id = a.user_id";

fn map_attendance(row: &Row<'_>) -> rusqlite::Result<Attendance> {
    Ok(Attendance {
        id: uuid_col(row, 0)?,
        event_id: uuid_col(row, 1)?,
        user_id: uuid_col(row, 2)?,
        full_name: row.get(3)?,
        method: enum_col(row, 4)?,
        confidence: row.get(5)?,
        checked_in_at: ts_col(row, 6)?,
    })
}

pub(crate) fn map_event_stats(row: &Row<'_>) -> rusqlite::Result<EventAttendanceStats> {
    Ok(EventAttendanceStats {
        event_id: uuid_col(row, 0)?,
        title: row.get(1)?,
        starts_at: ts_col(row, 2)?,
        manual: row.get(3)?,
        face: row.get(4)?,
        total: row.get(5)?,
    })
}

/// Per-event counts; callers append their own WHERE / ORDER BY.
pub(crate) const EVENT_STATS_SELECT: &str = "
    SELECT e.id, e.title, e.starts_at,
           COALESCE(SUM(a.method = 'manual'), 0),
           COALESCE(SUM(a.method = 'face'), 0),
           COUNT(a.id)
    FROM events e
    LEFT JOIN attendance a ON a.event_id = e.id";

impl Database {
    /// Records attendance once per user per event. Returns the stored row and
    /// whether this call created it.
    pub fn check_in(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        method: AttendanceMethod,
        confidence: Option<f64>,
    ) -> Result<(Attendance, bool)> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO attendance (id, event_id, user_id, method, confidence)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    Uuid::new_v4().to_string(),
                    event_id.to_string(),
                    user_id.to_string(),
                    method.as_str(),
                    confidence,
                ],
            )?;
            let sql = format!("{ATTENDANCE_SELECT} WHERE a.event_id = ?1 AND a.user_id = ?2");
            let row = conn.query_row(
                &sql,
                params![event_id.to_string(), user_id.to_string()],
                map_attendance,
            )?;
            Ok((row, inserted > 0))
        })
    }

    /// Attendees of one event in check-in order.
    pub fn list_attendance(&self, event_id: Uuid) -> Result<Vec<Attendance>> {
        self.with_conn(|conn| {
            let sql = format!("{ATTENDANCE_SELECT} WHERE a.event_id = ?1 ORDER BY a.checked_in_at, a.rowid");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([event_id.to_string()], map_attendance)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Check-in counts split by method, for one event or all of them (latest first).
    pub fn attendance_stats(&self, event_id: Option<Uuid>) -> Result<Vec<EventAttendanceStats>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{EVENT_STATS_SELECT}
                 WHERE ?1 IS NULL OR e.id = ?1
                 GROUP BY e.id
                 ORDER BY e.starts_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([event_id.map(|e| e.to_string())], map_event_stats)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
