/// User model
///
/// Users are created by the (excluded) authentication layer; the core only reads
/// them for display names, invite email matching and notification recipients.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     name VARCHAR(50) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::lifecycle::Lifecycle;

/// User account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address, unique across users (stored lowercase)
    pub email: String,

    /// Display name
    pub name: String,

    pub created_at: DateTime<Utc>,

    pub lifecycle: Lifecycle,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 50))]
    pub name: String,
}

impl User {
    /// Builds a new active user from validated input
    pub fn new(data: CreateUser) -> Self {
        User {
            id: Uuid::new_v4(),
            email: normalize_email(&data.email),
            name: data.name,
            created_at: Utc::now(),
            lifecycle: Lifecycle::Active,
        }
    }
}

/// Emails compare case-insensitively
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
