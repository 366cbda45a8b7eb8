//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use animix_core::{Email, Role, UserId};

/// A storefront account (domain type).
///
/// The password hash never leaves the repository layer.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
