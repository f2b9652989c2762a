use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use flock_types::models::{Appointment, AppointmentStatus};

use crate::Database;
use crate::columns::{enum_col, format_ts, ts_col, uuid_col};

const APPOINTMENT_SELECT: &str = "
    SELECT a.id, a.member_id, m.full_name, a.pastor_id, p.full_name, a.subject, a.notes,
           a.scheduled_at, a.status, a.created_at
    FROM appointments a
    JOIN users m ON m.id = a.member_id
    JOIN users p ON p.id = a.pastor_id";

fn map_appointment(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: uuid_col(row, 0)?,
        member_id: uuid_col(row, 1)?,
        member_name: row.get(2)?,
        pastor_id: uuid_col(row, 3)?,
        pastor_name: row.get(4)?,
        subject: row.get(5)?,
        notes: row.get(6)?,
        scheduled_at: ts_col(row, 7)?,
        status: enum_col(row, 8)?,
        created_at: ts_col(row, 9)?,
    })
}

impl Database {
    pub fn create_appointment(
        &self,
        id: Uuid,
        member_id: Uuid,
        pastor_id: Uuid,
        subject: &str,
        notes: Option<&str>,
        scheduled_at: &DateTime<Utc>,
    ) -> Result<Appointment> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO appointments (id, member_id, pastor_id, subject, notes, scheduled_at, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.to_string(),
                    member_id.to_string(),
                    pastor_id.to_string(),
                    subject,
                    notes,
                    format_ts(scheduled_at),
                    AppointmentStatus::Pending.as_str(),
                ],
            )?;
            Ok(())
        })?;
        self.get_appointment(id)?
            .ok_or_else(|| anyhow::anyhow!("appointment vanished after insert"))
    }

    pub fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        self.with_conn(|conn| {
            let sql = format!("{APPOINTMENT_SELECT} WHERE a.id = ?1");
            Ok(conn.query_row(&sql, [id.to_string()], map_appointment).optional()?)
        })
    }

    /// Ordered by `scheduled_at`. With `involving`, only appointments where that
    /// user is the booking member or the assigned pastor.
    pub fn list_appointments(&self, involving: Option<Uuid>) -> Result<Vec<Appointment>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{APPOINTMENT_SELECT}
                 WHERE ?1 IS NULL OR a.member_id = ?1 OR a.pastor_id = ?1
                 ORDER BY a.scheduled_at"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([involving.map(|u| u.to_string())], map_appointment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_appointment_status(&self, id: Uuid, status: AppointmentStatus) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE appointments SET status = ?2 WHERE id = ?1",
                params![id.to_string(), status.as_str()],
            )?;
            Ok(changed > 0)
        })
    }
}
