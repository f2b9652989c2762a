//! Database-side row types that have no direct API counterpart.
//! Records that map one-to-one onto `flock_types::models` are decoded
//! straight into those types by the query modules.

use flock_types::models::{DonationMethod, User};
use uuid::Uuid;

/// A user together with the stored Argon2 hash. Only the auth handlers see this.
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

pub struct NewDonation<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub amount_cents: i64,
    pub currency: &'a str,
    pub method: DonationMethod,
    pub note: Option<&'a str>,
}

/// Outcome of flipping a like/support row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggle {
    /// `true` when the row was inserted, `false` when it was removed.
    pub active: bool,
    pub count: i64,
}

/// Position in a channel's history; pages return messages strictly older.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageCursor {
    pub created_at: String,
    pub rowid: i64,
}

impl MessageCursor {
    /// Everything stored before `created_at`, regardless of insertion order.
    pub fn at_time(created_at: String) -> Self {
        Self { created_at, rowid: 0 }
    }
}
