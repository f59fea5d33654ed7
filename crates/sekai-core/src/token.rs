//! Signed session and service tokens.
//!
//! A [`TokenCodec`] owns one secret. The identity service keeps separate
//! codecs for access tokens, refresh tokens and service tokens; services that
//! only verify access tokens need just the access codec.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::db::unix_timestamp;
use crate::error::{AuthError, Result};

/// Namespace tag applied to player ids outside the credential store.
pub const PLAYER_ID_PREFIX: &str = "player:";

/// `42` -> `player:42`. Already-tagged ids are returned unchanged.
pub fn namespaced_player_id(player_id: &str) -> String {
    if player_id.starts_with(PLAYER_ID_PREFIX) {
        player_id.to_string()
    } else {
        format!("{PLAYER_ID_PREFIX}{player_id}")
    }
}

/// `player:42` -> `42`. Bare ids are returned unchanged.
pub fn bare_player_id(player_id: &str) -> &str {
    player_id
        .strip_prefix(PLAYER_ID_PREFIX)
        .unwrap_or(player_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims embedded in player-facing tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Unique per token, so two tokens minted in the same second differ.
    pub jti: String,
    /// Namespaced player id (`player:<id>`).
    pub player_id: String,
    pub role_code: i32,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
    pub kind: TokenKind,
}

impl Claims {
    pub fn is_access(&self) -> bool {
        self.kind == TokenKind::Access
    }

    pub fn is_refresh(&self) -> bool {
        self.kind == TokenKind::Refresh
    }
}

/// Claims embedded in service-to-service tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceClaims {
    pub jti: String,
    /// Name of the calling service.
    pub service: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 tokens for a single secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact: a token is dead the second after `exp`.
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue an access token expiring `ttl_secs` from now.
    pub fn issue_access(&self, ttl_secs: i64, player_id: &str, role_code: i32) -> Result<String> {
        let now = unix_timestamp();
        self.sign(&player_claims(
            player_id,
            role_code,
            now,
            now + ttl_secs,
            TokenKind::Access,
        ))
    }

    /// Issue a refresh token expiring `ttl_secs` from now.
    pub fn issue_refresh(&self, ttl_secs: i64, player_id: &str, role_code: i32) -> Result<String> {
        let now = unix_timestamp();
        self.sign(&player_claims(
            player_id,
            role_code,
            now,
            now + ttl_secs,
            TokenKind::Refresh,
        ))
    }

    /// Issue a new refresh token that keeps the expiry of the one it replaces.
    ///
    /// Every refresh token of a session shares the login's expiry ceiling, so
    /// rotating never lengthens the session.
    pub fn reissue_refresh(
        &self,
        fixed_expiry: i64,
        player_id: &str,
        role_code: i32,
    ) -> Result<String> {
        self.sign(&player_claims(
            player_id,
            role_code,
            unix_timestamp(),
            fixed_expiry,
            TokenKind::Refresh,
        ))
    }

    /// Verify signature and expiry and return the claims.
    pub fn parse(&self, token: &str) -> Result<Claims> {
        self.decode(token)
    }

    /// Issue a service token for `service` expiring `ttl_secs` from now.
    pub fn issue_service(&self, ttl_secs: i64, service: &str) -> Result<String> {
        let now = unix_timestamp();
        self.sign(&ServiceClaims {
            jti: uuid::Uuid::new_v4().to_string(),
            service: service.to_string(),
            iat: now,
            exp: now + ttl_secs,
        })
    }

    pub fn parse_service(&self, token: &str) -> Result<ServiceClaims> {
        self.decode(token)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenIssuance(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T> {
        jsonwebtoken::decode::<T>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            })
    }
}

fn player_claims(player_id: &str, role_code: i32, iat: i64, exp: i64, kind: TokenKind) -> Claims {
    Claims {
        jti: uuid::Uuid::new_v4().to_string(),
        player_id: player_id.to_string(),
        role_code,
        iat,
        exp,
        kind,
    }
}
