use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Local account row. `password_digest` is credential material: it never
/// serializes and is absent from the projection allow-list.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    /// Stable identifier assigned by the external identity provider
    pub subject_id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_digest: Option<String>,
    pub is_admin: bool,
    pub is_active: bool,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Projection allow-lists, one per resource. These are the only identifiers
/// that ever reach a SELECT clause, so each list doubles as the default
/// projection and as the input validator.
pub const USER_FIELDS: &[&str] = &[
    "id",
    "subject_id",
    "username",
    "is_admin",
    "is_active",
    "is_anonymous",
    "created_at",
    "updated_at",
];

pub const VILLAGE_FIELDS: &[&str] = &[
    "id",
    "name",
    "description",
    "is_public",
    "created_at",
    "updated_at",
];

pub const MESSAGE_FIELDS: &[&str] = &[
    "id",
    "content",
    "user_id",
    "village_id",
    "created_at",
    "updated_at",
];
