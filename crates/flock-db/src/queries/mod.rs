//! Query methods on [`crate::Database`], one module per resource.

mod analytics;
mod appointments;
mod attendance;
mod channels;
mod donations;
mod events;
mod prayers;
mod sermons;
mod testimonies;
mod users;

#[cfg(test)]
pub(crate) mod test_support {
    use flock_types::models::Role;
    use uuid::Uuid;

    use crate::Database;

    pub fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn user(db: &Database, name: &str, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        let email = format!("{}@example.org", name.to_lowercase());
        db.create_user(id, &email, "not-a-real-hash", name, None, role).unwrap();
        id
    }

    pub fn backdate(db: &Database, table: &str, column: &str, id: Uuid, ts: &str) {
        db.with_conn(|conn| {
            conn.execute(
                &format!("UPDATE {table} SET {column} = ?1 WHERE id = ?2"),
                rusqlite::params![ts, id.to_string()],
            )?;
            Ok(())
        })
        .unwrap();
    }
}
