//! Idempotent bootstrap data: one admin, the default channels and the
//! standing donation projects.

use anyhow::bail;
use tracing::info;
use uuid::Uuid;

use flock_db::Database;
use flock_types::models::Role;

const DEFAULT_CHANNELS: &[(&str, &str)] = &[
    ("general", "Church-wide conversation"),
    ("prayer-chain", "Share and follow prayer needs"),
    ("announcements", "News from the church office"),
];

const DEFAULT_PROJECTS: &[(&str, &str)] = &[
    ("General Fund", "Day-to-day ministry and operations"),
    ("Building Fund", "Maintenance and expansion of church buildings"),
    ("Missions", "Support for missionaries and outreach"),
];

pub struct AdminSeed<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub admin_created: bool,
    pub channels_created: usize,
    pub projects_created: usize,
}

pub fn run(db: &Database, admin: &AdminSeed<'_>) -> anyhow::Result<SeedSummary> {
    let email = admin.email.trim().to_lowercase();
    if !email.contains('@') {
        bail!("admin email is not valid");
    }

    let mut summary = SeedSummary::default();

    match db.get_credentials_by_email(&email)? {
        Some(existing) => {
            if existing.user.role != Role::Admin {
                db.set_role(existing.user.id, Role::Admin)?;
                info!("Promoted existing user {} to admin", email);
            }
        }
        None => {
            if admin.password.len() < 8 {
                bail!("admin password must be at least 8 characters");
            }
            let hash = flock_api::auth::hash_password(admin.password)?;
            db.create_user(Uuid::new_v4(), &email, &hash, admin.name.trim(), None, Role::Admin)?;
            summary.admin_created = true;
            info!("Created admin {}", email);
        }
    }

    for (name, description) in DEFAULT_CHANNELS {
        if db.get_channel_by_name(name)?.is_none() {
            db.create_channel(Uuid::new_v4(), name, Some(description))?;
            summary.channels_created += 1;
        }
    }

    for (name, description) in DEFAULT_PROJECTS {
        if !db.project_name_exists(name)? {
            db.create_project(Uuid::new_v4(), name, Some(description), 0)?;
            summary.projects_created += 1;
        }
    }

    info!(
        "Seed complete: {} channel(s), {} project(s) added",
        summary.channels_created, summary.projects_created
    );
    Ok(summary)
}
