use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                         // unique user ID
    pub email: String,                    // unique, compared as stored
    #[serde(skip_serializing)]
    pub password_hash: String,            // Argon2 hash, not exposed in JSON
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,    // the only refresh token currently accepted
    pub created_at: OffsetDateTime,       // creation timestamp
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}
