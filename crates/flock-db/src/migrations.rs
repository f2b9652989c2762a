use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Id of the channel every fresh database starts with.
pub const GENERAL_CHANNEL_ID: &str = "00000000-0000-0000-0000-000000000001";

const V1: &str = "
    CREATE TABLE users (
        id              TEXT PRIMARY KEY,
        email           TEXT NOT NULL UNIQUE,
        password        TEXT NOT NULL,
        full_name       TEXT NOT NULL,
        phone           TEXT,
        role            TEXT NOT NULL DEFAULT 'member'
                        CHECK (role IN ('admin', 'pastor', 'staff', 'member')),
        face_enrolled   INTEGER NOT NULL DEFAULT 0,
        created_at      TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE donation_projects (
        id              TEXT PRIMARY KEY,
        name            TEXT NOT NULL UNIQUE,
        description     TEXT,
        goal_cents      INTEGER NOT NULL CHECK (goal_cents >= 0),
        raised_cents    INTEGER NOT NULL DEFAULT 0,
        active          INTEGER NOT NULL DEFAULT 1,
        created_at      TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE donations (
        id              TEXT PRIMARY KEY,
        user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        project_id      TEXT REFERENCES donation_projects(id) ON DELETE SET NULL,
        amount_cents    INTEGER NOT NULL CHECK (amount_cents > 0),
        currency        TEXT NOT NULL DEFAULT 'USD',
        method          TEXT NOT NULL,
        note            TEXT,
        created_at      TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX idx_donations_created ON donations(created_at);
    CREATE INDEX idx_donations_user ON donations(user_id);

    CREATE TABLE appointments (
        id              TEXT PRIMARY KEY,
        member_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        pastor_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        subject         TEXT NOT NULL,
        notes           TEXT,
        scheduled_at    TEXT NOT NULL,
        status          TEXT NOT NULL DEFAULT 'pending',
        created_at      TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE prayers (
        id              TEXT PRIMARY KEY,
        author_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title           TEXT NOT NULL,
        body            TEXT NOT NULL,
        is_anonymous    INTEGER NOT NULL DEFAULT 0,
        status          TEXT NOT NULL DEFAULT 'open',
        support_count   INTEGER NOT NULL DEFAULT 0,
        created_at      TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE prayer_supports (
        prayer_id       TEXT NOT NULL REFERENCES prayers(id) ON DELETE CASCADE,
        user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at      TEXT NOT NULL DEFAULT (datetime('now')),
        PRIMARY KEY (prayer_id, user_id)
    );

    CREATE TABLE testimonies (
        id              TEXT PRIMARY KEY,
        author_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title           TEXT NOT NULL,
        body            TEXT NOT NULL,
        approved        INTEGER NOT NULL DEFAULT 0,
        likes_count     INTEGER NOT NULL DEFAULT 0,
        created_at      TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE testimony_likes (
        testimony_id    TEXT NOT NULL REFERENCES testimonies(id) ON DELETE CASCADE,
        user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at      TEXT NOT NULL DEFAULT (datetime('now')),
        PRIMARY KEY (testimony_id, user_id)
    );

    CREATE TABLE testimony_comments (
        id              TEXT PRIMARY KEY,
        testimony_id    TEXT NOT NULL REFERENCES testimonies(id) ON DELETE CASCADE,
        author_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        body            TEXT NOT NULL,
        created_at      TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX idx_testimony_comments ON testimony_comments(testimony_id, created_at);

    CREATE TABLE events (
        id              TEXT PRIMARY KEY,
        title           TEXT NOT NULL,
        description     TEXT,
        category        TEXT NOT NULL,
        location        TEXT,
        starts_at       TEXT NOT NULL,
        ends_at         TEXT,
        created_by      TEXT REFERENCES users(id) ON DELETE SET NULL,
        created_at      TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX idx_events_starts ON events(starts_at);

    CREATE TABLE sermons (
        id              TEXT PRIMARY KEY,
        title           TEXT NOT NULL,
        speaker         TEXT NOT NULL,
        series          TEXT,
        scripture       TEXT,
        media_url       TEXT,
        preached_on     TEXT NOT NULL,
        created_at      TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE channels (
        id              TEXT PRIMARY KEY,
        name            TEXT NOT NULL UNIQUE,
        description     TEXT,
        created_at      TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE messages (
        id              TEXT PRIMARY KEY,
        channel_id      TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
        author_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        body            TEXT NOT NULL,
        created_at      TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX idx_messages_channel ON messages(channel_id, created_at);

    CREATE TABLE attendance (
        id              TEXT PRIMARY KEY,
        event_id        TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
        user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        method          TEXT NOT NULL,
        confidence      REAL,
        checked_in_at   TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE (event_id, user_id)
    );

    CREATE INDEX idx_attendance_checked_in ON attendance(checked_in_at);

    INSERT INTO channels (id, name, description)
        VALUES ('00000000-0000-0000-0000-000000000001', 'general', 'Church-wide conversation');
";

/// Ordered list of schema migrations. The index + 1 is the schema version.
const MIGRATIONS: &[&str] = &[V1];

pub fn run(conn: &mut Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    for (idx, sql) in MIGRATIONS.iter().enumerate() {
        let target = idx as i64 + 1;
        if version >= target {
            continue;
        }

        info!("Running database migration v{}", target);
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [target])?;
        tx.commit()?;
    }

    info!("Database migrations complete");
    Ok(())
}
