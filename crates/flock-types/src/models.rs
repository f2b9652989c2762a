use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a stored or submitted enum value is not one of the known variants.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Text-backed enums share the same `as_str` / `FromStr` / `Display` shape,
/// and the strings double as the database representation.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError { kind: $kind, value: other.to_string() }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(
    /// Congregation role. Everything above `Member` counts as staff.
    Role, "role", {
        Admin => "admin",
        Pastor => "pastor",
        Staff => "staff",
        Member => "member",
    }
);

impl Role {
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Member)
    }

    /// Roles that can be booked for an appointment.
    pub fn can_counsel(&self) -> bool {
        matches!(self, Role::Pastor | Role::Admin)
    }
}

text_enum!(DonationMethod, "donation method", {
    Cash => "cash",
    Card => "card",
    BankTransfer => "bank_transfer",
    MobileMoney => "mobile_money",
    Other => "other",
});

text_enum!(AppointmentStatus, "appointment status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
    Completed => "completed",
});

text_enum!(PrayerStatus, "prayer status", {
    Open => "open",
    Answered => "answered",
});

text_enum!(AttendanceMethod, "attendance method", {
    Manual => "manual",
    Face => "face",
});

text_enum!(ReportKind, "report kind", {
    Donations => "donations",
    Attendance => "attendance",
    Membership => "membership",
});

text_enum!(StepAction, "workflow action", {
    Email => "email",
    Sms => "sms",
    Notification => "notification",
});

// -- Records --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub face_enrolled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationProject {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub goal_cents: i64,
    pub raised_cents: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub donor_name: String,
    pub project_id: Option<Uuid>,
    pub project_name: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub method: DonationMethod,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub member_id: Uuid,
    pub member_name: String,
    pub pastor_id: Uuid,
    pub pastor_name: String,
    pub subject: String,
    pub notes: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

/// Author fields are `None` when the prayer is anonymous and the viewer may
/// not see who posted it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prayer {
    pub id: Uuid,
    pub author_id: Option<Uuid>,
    pub author_name: Option<String>,
    pub title: String,
    pub body: String,
    pub is_anonymous: bool,
    pub status: PrayerStatus,
    pub support_count: i64,
    pub supported_by_me: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Testimony {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub title: String,
    pub body: String,
    pub approved: bool,
    pub likes_count: i64,
    pub comments_count: i64,
    pub liked_by_me: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestimonyComment {
    pub id: Uuid,
    pub testimony_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    /// Cleared when the creating account is deleted.
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sermon {
    pub id: Uuid,
    pub title: String,
    pub speaker: String,
    pub series: Option<String>,
    pub scripture: Option<String>,
    pub media_url: Option<String>,
    pub preached_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendance {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub method: AttendanceMethod,
    pub confidence: Option<f64>,
    pub checked_in_at: DateTime<Utc>,
}
