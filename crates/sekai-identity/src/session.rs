//! Session lifecycle: login, refresh, logout and token liveness.
//!
//! A session is one [`Credential`] record. It is created at login, has its
//! token pair replaced in place on every refresh, and is gone after logout.
//! Nothing here locks: a refresh racing a logout on the same session either
//! fails (logout landed first) or leaves the refreshed tokens revoked.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use sekai_core::config::JwtConfig;
use sekai_core::db::unix_timestamp;
use sekai_core::token::{bare_player_id, namespaced_player_id};
use sekai_core::{AuthError, TokenCodec};
use sekai_proto::v1::PlayerProfile;

use crate::player::PlayerDirectory;
use crate::storage::{Credential, CredentialStore, DatabaseError, NewCredential};

/// Result of a login or refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Profile with a namespaced player id.
    pub profile: PlayerProfile,
    pub credential: Credential,
}

impl Session {
    fn new(mut profile: PlayerProfile, credential: Credential) -> Self {
        profile.id = namespaced_player_id(&profile.id);
        Self {
            profile,
            credential,
        }
    }
}

pub struct SessionManager {
    store: CredentialStore,
    players: Arc<dyn PlayerDirectory>,
    access: TokenCodec,
    refresh: TokenCodec,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl SessionManager {
    pub fn new(store: CredentialStore, players: Arc<dyn PlayerDirectory>, jwt: &JwtConfig) -> Self {
        Self {
            store,
            players,
            access: TokenCodec::new(jwt.access_secret.as_bytes()),
            refresh: TokenCodec::new(jwt.refresh_secret.as_bytes()),
            access_ttl_secs: jwt.access_ttl_secs,
            refresh_ttl_secs: jwt.refresh_ttl_secs,
        }
    }

    /// Resolve credentials with the player directory and open a new session.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let profile = self.players.credential_search(email, password).await?;
        let player_id = namespaced_player_id(&profile.id);

        let access_token = self
            .access
            .issue_access(self.access_ttl_secs, &player_id, profile.role_code)?;
        let refresh_token = self
            .refresh
            .issue_refresh(self.refresh_ttl_secs, &player_id, profile.role_code)?;

        let id = self
            .store
            .insert(&NewCredential {
                player_id: bare_player_id(&profile.id),
                role_code: profile.role_code,
                access_token: &access_token,
                refresh_token: &refresh_token,
            })
            .await?;
        let credential = self.reload(&id).await?;

        info!(credential_id = %id, player_id = %player_id, "Player logged in");
        Ok(Session::new(profile, credential))
    }

    /// Rotate the token pair of session `credential_id`.
    ///
    /// Only the refresh token currently stored for the session is accepted,
    /// so a superseded token or one from another session cannot rotate it.
    /// The access token gets a fresh expiry from the current profile; the
    /// refresh token is reissued with the expiry of the one presented. No
    /// store write happens unless the token parses, matches and the profile
    /// resolves.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(
        &self,
        refresh_token: &str,
        credential_id: &str,
    ) -> Result<Session, AuthError> {
        let claims = self.refresh.parse(refresh_token).inspect_err(|e| {
            warn!(error = %e, "Rejected refresh token");
        })?;
        if !claims.is_refresh() {
            warn!(
                player_id = %claims.player_id,
                "Token presented for refresh is not a refresh token"
            );
            return Err(AuthError::InvalidToken);
        }

        let current = self.reload(credential_id).await?;
        if current.refresh_token != refresh_token {
            warn!(
                credential_id,
                player_id = %claims.player_id,
                "Refresh token does not belong to this session"
            );
            return Err(AuthError::RevokedOrNotFound);
        }

        let profile = self
            .players
            .find_profile_for_refresh(bare_player_id(&claims.player_id))
            .await?;
        let player_id = namespaced_player_id(&profile.id);

        let access_token = self
            .access
            .issue_access(self.access_ttl_secs, &player_id, profile.role_code)?;
        let refresh_token = self
            .refresh
            .reissue_refresh(claims.exp, &player_id, profile.role_code)?;

        self.store
            .update_tokens(
                credential_id,
                bare_player_id(&profile.id),
                &access_token,
                &refresh_token,
                unix_timestamp(),
            )
            .await?;
        let credential = self.reload(credential_id).await?;

        info!(credential_id, player_id = %player_id, "Session refreshed");
        Ok(Session::new(profile, credential))
    }

    /// End session `credential_id`. Returns the number of records removed.
    #[instrument(skip(self))]
    pub async fn logout(&self, credential_id: &str) -> Result<i64, AuthError> {
        let deleted = self.store.delete(credential_id).await?;
        info!(credential_id, deleted, "Player logged out");
        Ok(i64::try_from(deleted).unwrap_or(i64::MAX))
    }

    /// Whether `access_token` belongs to a live session and still verifies.
    ///
    /// Unknown and unverifiable tokens both answer `false`; only store
    /// failures are errors.
    #[instrument(skip_all)]
    pub async fn access_token_search(&self, access_token: &str) -> Result<bool, AuthError> {
        match self.store.find_by_access_token(access_token).await {
            Ok(credential) => Ok(self
                .access
                .parse(&credential.access_token)
                .is_ok_and(|claims| claims.is_access())),
            Err(DatabaseError::NotFound(_)) => Ok(false),
            Err(e) => {
                warn!(error = %e, "Access token lookup failed");
                Err(e.into())
            }
        }
    }

    pub async fn role_count(&self) -> Result<i64, AuthError> {
        Ok(self.store.count_roles().await?)
    }

    async fn reload(&self, id: &str) -> Result<Credential, AuthError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::Store(format!("credential {id} not found")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::player::InMemoryPlayerDirectory;
    use crate::storage::IdentityDatabase;

    const ACCESS_SECRET: &[u8] = b"access-secret";
    const REFRESH_SECRET: &[u8] = b"refresh-secret";

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            access_secret: "access-secret".into(),
            refresh_secret: "refresh-secret".into(),
            api_secret: "internal-secret".into(),
            ..JwtConfig::default()
        }
    }

    async fn setup() -> (SessionManager, Arc<InMemoryPlayerDirectory>) {
        let store = CredentialStore::open_in_memory().await.unwrap();
        setup_with_store(store).await
    }

    async fn setup_with_store(
        store: CredentialStore,
    ) -> (SessionManager, Arc<InMemoryPlayerDirectory>) {
        let players = Arc::new(InMemoryPlayerDirectory::new());
        players
            .insert("p1", "alice@example.com", "password123", 0)
            .await;
        let sessions = SessionManager::new(
            store,
            Arc::clone(&players) as Arc<dyn PlayerDirectory>,
            &jwt_config(),
        );
        (sessions, players)
    }

    async fn login_alice(sessions: &SessionManager) -> Session {
        sessions
            .login("alice@example.com", "password123")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn login_mints_tokens_for_the_player() {
        let (sessions, _players) = setup().await;
        let session = login_alice(&sessions).await;

        assert_eq!(session.profile.id, "player:p1");
        assert_eq!(session.credential.player_id, "p1");

        let claims = TokenCodec::new(ACCESS_SECRET)
            .parse(&session.credential.access_token)
            .unwrap();
        assert_eq!(claims.player_id, "player:p1");
        assert_eq!(claims.role_code, 0);
        assert!(claims.is_access());

        let refresh = TokenCodec::new(REFRESH_SECRET)
            .parse(&session.credential.refresh_token)
            .unwrap();
        assert!(refresh.is_refresh());
    }

    #[tokio::test]
    async fn login_with_wrong_password_stores_nothing() {
        let (sessions, _players) = setup().await;
        let err = sessions
            .login("alice@example.com", "nope")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn refresh_keeps_refresh_expiry_and_session_id() {
        let (sessions, _players) = setup().await;
        let session = login_alice(&sessions).await;
        let codec = TokenCodec::new(REFRESH_SECRET);
        let original_exp = codec.parse(&session.credential.refresh_token).unwrap().exp;

        let refreshed = sessions
            .refresh(&session.credential.refresh_token, &session.credential.id)
            .await
            .unwrap();

        assert_eq!(refreshed.credential.id, session.credential.id);
        assert_ne!(
            refreshed.credential.access_token,
            session.credential.access_token
        );
        let claims = codec.parse(&refreshed.credential.refresh_token).unwrap();
        assert_eq!(claims.exp, original_exp);

        // The previous access token no longer belongs to any session.
        assert!(
            !sessions
                .access_token_search(&session.credential.access_token)
                .await
                .unwrap()
        );
        assert!(
            sessions
                .access_token_search(&refreshed.credential.access_token)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn refresh_picks_up_role_change() {
        let (sessions, players) = setup().await;
        let session = login_alice(&sessions).await;
        players.set_role("p1", 1).await;

        let refreshed = sessions
            .refresh(&session.credential.refresh_token, &session.credential.id)
            .await
            .unwrap();

        assert_eq!(refreshed.profile.role_code, 1);
        let claims = TokenCodec::new(ACCESS_SECRET)
            .parse(&refreshed.credential.access_token)
            .unwrap();
        assert_eq!(claims.role_code, 1);
    }

    #[tokio::test]
    async fn expired_refresh_token_writes_nothing() {
        let (sessions, _players) = setup().await;
        let session = login_alice(&sessions).await;
        let expired = TokenCodec::new(REFRESH_SECRET)
            .reissue_refresh(unix_timestamp() - 10, "player:p1", 0)
            .unwrap();

        let err = sessions
            .refresh(&expired, &session.credential.id)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Expired);

        let stored = sessions
            .store
            .find_by_id(&session.credential.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, session.credential);
    }

    #[tokio::test]
    async fn access_token_cannot_refresh() {
        let (sessions, _players) = setup().await;
        let session = login_alice(&sessions).await;

        let err = sessions
            .refresh(&session.credential.access_token, &session.credential.id)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn refresh_for_removed_player_fails_lookup() {
        let (sessions, players) = setup().await;
        let session = login_alice(&sessions).await;
        players.remove("p1").await;

        let err = sessions
            .refresh(&session.credential.refresh_token, &session.credential.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ProfileLookup(_)));
    }

    #[tokio::test]
    async fn logout_revokes_a_still_verifiable_token() {
        let (sessions, _players) = setup().await;
        let session = login_alice(&sessions).await;
        let access = session.credential.access_token;

        assert!(sessions.access_token_search(&access).await.unwrap());
        assert_eq!(sessions.logout(&session.credential.id).await.unwrap(), 1);

        assert!(TokenCodec::new(ACCESS_SECRET).parse(&access).is_ok());
        assert!(!sessions.access_token_search(&access).await.unwrap());
    }

    #[tokio::test]
    async fn second_logout_is_a_store_error() {
        let (sessions, _players) = setup().await;
        let session = login_alice(&sessions).await;

        sessions.logout(&session.credential.id).await.unwrap();
        let err = sessions.logout(&session.credential.id).await.unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));
    }

    #[tokio::test]
    async fn logout_then_refresh_is_a_store_error() {
        let (sessions, _players) = setup().await;
        let session = login_alice(&sessions).await;

        sessions.logout(&session.credential.id).await.unwrap();
        let err = sessions
            .refresh(&session.credential.refresh_token, &session.credential.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));
    }

    #[tokio::test]
    async fn refresh_then_logout_revokes_refreshed_token() {
        let (sessions, _players) = setup().await;
        let session = login_alice(&sessions).await;

        let refreshed = sessions
            .refresh(&session.credential.refresh_token, &session.credential.id)
            .await
            .unwrap();
        sessions.logout(&session.credential.id).await.unwrap();

        assert!(
            !sessions
                .access_token_search(&refreshed.credential.access_token)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn unknown_token_is_not_valid() {
        let (sessions, _players) = setup().await;
        assert!(!sessions.access_token_search("garbage").await.unwrap());
    }

    #[tokio::test]
    async fn role_count_matches_catalog() {
        let (sessions, _players) = setup().await;
        assert_eq!(sessions.role_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn superseded_refresh_token_is_rejected() {
        let (sessions, _players) = setup().await;
        let session = login_alice(&sessions).await;

        sessions
            .refresh(&session.credential.refresh_token, &session.credential.id)
            .await
            .unwrap();
        let err = sessions
            .refresh(&session.credential.refresh_token, &session.credential.id)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::RevokedOrNotFound);
    }

    #[tokio::test]
    async fn refresh_token_cannot_rotate_another_session() {
        let (sessions, players) = setup().await;
        players.insert("p2", "bob@example.com", "hunter22", 1).await;
        let alice = login_alice(&sessions).await;
        let bob = sessions.login("bob@example.com", "hunter22").await.unwrap();

        let err = sessions
            .refresh(&alice.credential.refresh_token, &bob.credential.id)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::RevokedOrNotFound);

        let stored = sessions
            .store
            .find_by_id(&bob.credential.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, bob.credential);
        assert!(
            sessions
                .access_token_search(&bob.credential.access_token)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn store_deadline_surfaces_as_store_error() {
        let db = IdentityDatabase::open_in_memory().await.unwrap();
        let store = CredentialStore::new(db, Duration::from_millis(100));
        let (sessions, _players) = setup_with_store(store.clone()).await;
        let session = login_alice(&sessions).await;

        // The in-memory pool has a single connection; holding it stalls every query.
        let held = store.pool().acquire().await.unwrap();

        let err = sessions
            .access_token_search(&session.credential.access_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Store(ref msg) if msg.contains("timed out")));

        let err = sessions.logout(&session.credential.id).await.unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));

        drop(held);
        assert!(
            sessions
                .access_token_search(&session.credential.access_token)
                .await
                .unwrap()
        );
    }
}
