//! Data models for identity storage.

use serde::{Deserialize, Serialize};

/// One login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Credential {
    pub id: String,
    /// Bare player id; namespaced only when surfaced outside the store.
    pub player_id: String,
    pub role_code: i32,
    pub access_token: String,
    pub refresh_token: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields supplied by the caller when a session is created.
#[derive(Debug, Clone, Copy)]
pub struct NewCredential<'a> {
    pub player_id: &'a str,
    pub role_code: i32,
    pub access_token: &'a str,
    pub refresh_token: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub code: i32,
    pub title: String,
}
