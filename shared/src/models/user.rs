//! User account models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifetime of a password-reset one-time code
pub const OTP_TTL_MINUTES: i64 = 10;

/// How long after OTP verification a password reset is still accepted
pub const RESET_WINDOW_MINUTES: i64 = 15;

/// A user account; every other entity is owned by exactly one user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Emails are unique case-insensitively; store and compare them lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Render a one-time code drawn from `100_000..1_000_000` as six digits
pub fn format_otp(code: u32) -> String {
    format!("{:06}", code % 1_000_000)
}
