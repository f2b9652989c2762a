use anyhow::{Result, bail};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use flock_types::api::MonthlyTotal;
use flock_types::models::{Donation, DonationProject};

use crate::Database;
use crate::columns::{enum_col, opt_uuid_col, ts_col, uuid_col};
use crate::models::NewDonation;

const PROJECT_COLUMNS: &str =
    "id, name, description, goal_cents, raised_cents, active, created_at";

const DONATION_SELECT: &str = "
    SELECT d.id, d.user_id, u.full_name, d.project_id, p.name, d.amount_cents,
           d.currency, d.method, d.note, d.created_at
    FROM donations d
    JOIN users u ON u.id = d.user_id
    LEFT JOIN donation_projects p ON p.id = d.project_id";

fn map_project(row: &Row<'_>) -> rusqlite::Result<DonationProject> {
    Ok(DonationProject {
        id: uuid_col(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        goal_cents: row.get(3)?,
        raised_cents: row.get(4)?,
        active: row.get(5)?,
        created_at: ts_col(row, 6)?,
    })
}

fn map_donation(row: &Row<'_>) -> rusqlite::Result<Donation> {
    Ok(Donation {
        id: uuid_col(row, 0)?,
        user_id: uuid_col(row, 1)?,
        donor_name: row.get(2)?,
        project_id: opt_uuid_col(row, 3)?,
        project_name: row.get(4)?,
        amount_cents: row.get(5)?,
        currency: row.get(6)?,
        method: enum_col(row, 7)?,
        note: row.get(8)?,
        created_at: ts_col(row, 9)?,
    })
}

impl Database {
    // -- Projects --

    pub fn create_project(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
        goal_cents: i64,
    ) -> Result<DonationProject> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO donation_projects (id, name, description, goal_cents)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id.to_string(), name, description, goal_cents],
            )?;
            query_project(conn, id)?.ok_or_else(|| anyhow::anyhow!("project vanished after insert"))
        })
    }

    pub fn project_name_exists(&self, name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM donation_projects WHERE name = ?1 COLLATE NOCASE",
                    [name],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<DonationProject>> {
        self.with_conn(|conn| query_project(conn, id))
    }

    /// Active projects first, then by name.
    pub fn list_projects(&self) -> Result<Vec<DonationProject>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {PROJECT_COLUMNS} FROM donation_projects ORDER BY active DESC, name"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_project)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_project(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        goal_cents: Option<i64>,
        active: Option<bool>,
    ) -> Result<Option<DonationProject>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE donation_projects
                 SET name = COALESCE(?2, name),
                     description = COALESCE(?3, description),
                     goal_cents = COALESCE(?4, goal_cents),
                     active = COALESCE(?5, active)
                 WHERE id = ?1",
                params![id.to_string(), name, description, goal_cents, active],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_project(conn, id)
        })
    }

    // -- Donations --

    /// Records a donation and credits its project in one transaction.
    pub fn create_donation(&self, new: &NewDonation<'_>) -> Result<Donation> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO donations (id, user_id, project_id, amount_cents, currency, method, note)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    new.id.to_string(),
                    new.user_id.to_string(),
                    new.project_id.map(|p| p.to_string()),
                    new.amount_cents,
                    new.currency,
                    new.method.as_str(),
                    new.note,
                ],
            )?;

            if let Some(project_id) = new.project_id {
                let credited = tx.execute(
                    "UPDATE donation_projects SET raised_cents = raised_cents + ?2 WHERE id = ?1",
                    params![project_id.to_string(), new.amount_cents],
                )?;
                if credited == 0 {
                    bail!("donation project {} not found", project_id);
                }
            }

            let donation = query_donation(&tx, new.id)?
                .ok_or_else(|| anyhow::anyhow!("donation vanished after insert"))?;
            tx.commit()?;
            Ok(donation)
        })
    }

    /// Newest first, optionally narrowed to one donor and/or one project.
    pub fn list_donations(
        &self,
        user_id: Option<Uuid>,
        project_id: Option<Uuid>,
    ) -> Result<Vec<Donation>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{DONATION_SELECT}
                 WHERE (?1 IS NULL OR d.user_id = ?1) AND (?2 IS NULL OR d.project_id = ?2)
                 ORDER BY d.created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![user_id.map(|u| u.to_string()), project_id.map(|p| p.to_string())],
                    map_donation,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Twelve entries, January first; months without donations report zero.
    pub fn monthly_totals(&self, year: i32) -> Result<Vec<MonthlyTotal>> {
        let mut months: Vec<MonthlyTotal> = (1..=12)
            .map(|month| MonthlyTotal { month, total_cents: 0, count: 0 })
            .collect();

        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT CAST(strftime('%m', created_at) AS INTEGER), SUM(amount_cents), COUNT(*)
                 FROM donations
                 WHERE strftime('%Y', created_at) = ?1
                 GROUP BY 1",
            )?;
            let rows = stmt
                .query_map([format!("{year:04}")], |row| {
                    Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        for (month, total, count) in rows {
            if let Some(slot) = months.get_mut(month as usize - 1) {
                slot.total_cents = total;
                slot.count = count;
            }
        }
        Ok(months)
    }
}

fn query_project(conn: &Connection, id: Uuid) -> Result<Option<DonationProject>> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM donation_projects WHERE id = ?1");
    Ok(conn.query_row(&sql, [id.to_string()], map_project).optional()?)
}

fn query_donation(conn: &Connection, id: Uuid) -> Result<Option<Donation>> {
    let sql = format!("{DONATION_SELECT} WHERE d.id = ?1");
    Ok(conn.query_row(&sql, [id.to_string()], map_donation).optional()?)
}
