//! Credential store queries.
//!
//! Every query is a single statement run under the store deadline. Writes
//! that touch zero rows are errors, even when the row exists and already held
//! the target values.

use sekai_core::db::{DatabaseError, unix_timestamp, with_deadline};
use tracing::debug;

use super::db::CredentialStore;
use super::models::{Credential, NewCredential, Role};

impl CredentialStore {
    // =========================================================================
    // Credential queries
    // =========================================================================

    /// Insert a new session and return its store-assigned id.
    pub async fn insert(&self, new: &NewCredential<'_>) -> Result<String, DatabaseError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = unix_timestamp();

        let result = with_deadline(self.deadline(), async {
            sqlx::query(
                "INSERT INTO credentials (id, player_id, role_code, access_token, refresh_token, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(id.as_str())
            .bind(new.player_id)
            .bind(new.role_code)
            .bind(new.access_token)
            .bind(new.refresh_token)
            .bind(now)
            .bind(now)
            .execute(self.pool())
            .await
            .map_err(DatabaseError::from)
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::Query(format!(
                "Insert of credential {id} was not acknowledged"
            )));
        }

        debug!(credential_id = %id, player_id = %new.player_id, "Credential inserted");
        Ok(id)
    }

    /// Get a session by id. Absence is `None`, not an error.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Credential>, DatabaseError> {
        with_deadline(self.deadline(), async {
            sqlx::query_as::<_, Credential>("SELECT * FROM credentials WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool())
                .await
                .map_err(DatabaseError::from)
        })
        .await
    }

    /// Get the session currently holding `access_token`.
    pub async fn find_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Credential, DatabaseError> {
        with_deadline(self.deadline(), async {
            sqlx::query_as::<_, Credential>("SELECT * FROM credentials WHERE access_token = ?")
                .bind(access_token)
                .fetch_optional(self.pool())
                .await
                .map_err(DatabaseError::from)
        })
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Credential for access token".to_string()))
    }

    /// Replace the token pair of session `id` in place.
    pub async fn update_tokens(
        &self,
        id: &str,
        player_id: &str,
        access_token: &str,
        refresh_token: &str,
        now: i64,
    ) -> Result<(), DatabaseError> {
        let result = with_deadline(self.deadline(), async {
            sqlx::query(
                "UPDATE credentials SET player_id = ?, access_token = ?, refresh_token = ?, updated_at = ? WHERE id = ?",
            )
            .bind(player_id)
            .bind(access_token)
            .bind(refresh_token)
            .bind(now)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(DatabaseError::from)
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Credential {id}")));
        }

        Ok(())
    }

    /// Delete session `id`, returning the number of rows removed.
    pub async fn delete(&self, id: &str) -> Result<u64, DatabaseError> {
        let result = with_deadline(self.deadline(), async {
            sqlx::query("DELETE FROM credentials WHERE id = ?")
                .bind(id)
                .execute(self.pool())
                .await
                .map_err(DatabaseError::from)
        })
        .await?;

        match result.rows_affected() {
            0 => Err(DatabaseError::NotFound(format!("Credential {id}"))),
            n => Ok(n),
        }
    }

    // =========================================================================
    // Role queries
    // =========================================================================

    /// Number of role definitions.
    pub async fn count_roles(&self) -> Result<i64, DatabaseError> {
        with_deadline(self.deadline(), async {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM roles")
                .fetch_one(self.pool())
                .await
                .map_err(DatabaseError::from)
        })
        .await
    }

    /// The role catalog, ordered by code.
    pub async fn list_roles(&self) -> Result<Vec<Role>, DatabaseError> {
        with_deadline(self.deadline(), async {
            sqlx::query_as::<_, Role>("SELECT code, title FROM roles ORDER BY code")
                .fetch_all(self.pool())
                .await
                .map_err(DatabaseError::from)
        })
        .await
    }
}
