use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use flock_types::models::{Role, User};

use crate::Database;
use crate::columns::{enum_col, ts_col, uuid_col};
use crate::models::UserCredentials;

const USER_COLUMNS: &str = "id, email, full_name, phone, role, face_enrolled, created_at";

pub(crate) fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_col(row, 0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        phone: row.get(3)?,
        role: enum_col(row, 4)?,
        face_enrolled: row.get(5)?,
        created_at: ts_col(row, 6)?,
    })
}

impl Database {
    pub fn create_user(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &str,
        full_name: &str,
        phone: Option<&str>,
        role: Role,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, full_name, phone, role)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id.to_string(), email, password_hash, full_name, phone, role.as_str()],
            )?;
            Ok(())
        })
    }

    pub fn email_exists(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM users WHERE email = ?1", [email], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn get_credentials_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS}, password FROM users WHERE email = ?1");
            let row = conn
                .query_row(&sql, [email], |row| {
                    Ok(UserCredentials {
                        user: map_user(row)?,
                        password_hash: row.get(7)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    /// Members ordered by name. `search` matches name or email, case-insensitively.
    pub fn list_users(&self, role: Option<Role>, search: Option<&str>) -> Result<Vec<User>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(&s.to_lowercase())));

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE (?1 IS NULL OR role = ?1)
                   AND (?2 IS NULL OR lower(full_name) LIKE ?2 ESCAPE '\\' OR lower(email) LIKE ?2 ESCAPE '\\')
                 ORDER BY full_name COLLATE NOCASE"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![role.map(|r| r.as_str()), pattern], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Applies the provided fields; returns the updated user or `None` if it does not exist.
    pub fn update_user(
        &self,
        id: Uuid,
        full_name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET full_name = COALESCE(?2, full_name), phone = COALESCE(?3, phone)
                 WHERE id = ?1",
                params![id.to_string(), full_name, phone],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_user(conn, id)
        })
    }

    pub fn set_role(&self, id: Uuid, role: Role) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET role = ?2 WHERE id = ?1",
                params![id.to_string(), role.as_str()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_face_enrolled(&self, id: Uuid, enrolled: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET face_enrolled = ?2 WHERE id = ?1",
                params![id.to_string(), enrolled],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deletes the user and everything they own. Like and support counters on
    /// other people's posts, and the `raised_cents` of projects they gave to,
    /// are adjusted before the cascade drops the rows.
    pub fn delete_user(&self, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let uid = id.to_string();

            tx.execute(
                "UPDATE testimonies SET likes_count = likes_count - 1
                 WHERE id IN (SELECT testimony_id FROM testimony_likes WHERE user_id = ?1)",
                [&uid],
            )?;
            tx.execute(
                "UPDATE prayers SET support_count = support_count - 1
                 WHERE id IN (SELECT prayer_id FROM prayer_supports WHERE user_id = ?1)",
                [&uid],
            )?;
            tx.execute(
                "UPDATE donation_projects SET raised_cents = raised_cents - (
                     SELECT COALESCE(SUM(amount_cents), 0) FROM donations
                     WHERE project_id = donation_projects.id AND user_id = ?1)
                 WHERE id IN (SELECT project_id FROM donations WHERE user_id = ?1)",
                [&uid],
            )?;
            let changed = tx.execute("DELETE FROM users WHERE id = ?1", [&uid])?;

            tx.commit()?;
            Ok(changed > 0)
        })
    }
}

/// Makes `%`, `_` and `\` match literally under `ESCAPE '\'`.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn query_user(conn: &Connection, id: Uuid) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let row = conn.query_row(&sql, [id.to_string()], map_user).optional()?;
    Ok(row)
}
