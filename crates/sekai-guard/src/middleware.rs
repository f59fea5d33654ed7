//! Access control for protected routes.
//!
//! A protected route composes up to three checks, in order:
//! [`AccessGuard::authorize_jwt`] establishes who the caller is,
//! [`AccessGuard::authorize_roles`] decides whether the caller's role may use
//! the route, and [`AccessGuard::validate_player_param`] ties a `player_id`
//! path parameter to the caller.

use std::sync::Arc;

use tonic::{Request, Status};
use tracing::{debug, warn};

use sekai_core::rbac::check_roles;
use sekai_core::{AuthError, TokenCodec};

use crate::identity::IdentityLookup;

/// Metadata key carrying the player's access token.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Identity attached to a request once its access token has been accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Namespaced player id (`player:<id>`).
    pub player_id: String,
    pub role_code: i32,
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[derive(Clone)]
pub struct AccessGuard {
    access: Arc<TokenCodec>,
    identity: Arc<dyn IdentityLookup>,
}

impl AccessGuard {
    pub fn new(access: Arc<TokenCodec>, identity: Arc<dyn IdentityLookup>) -> Self {
        Self { access, identity }
    }

    /// Accept `access_token` if it verifies locally and its session is live.
    ///
    /// Forged and expired tokens are rejected before any network call.
    pub async fn authorize_jwt(&self, access_token: &str) -> Result<AuthContext, AuthError> {
        let claims = self.access.parse(access_token).inspect_err(|e| {
            warn!(error = %e, "Rejected access token");
        })?;
        if !claims.is_access() {
            warn!(player_id = %claims.player_id, "Rejected non-access token");
            return Err(AuthError::InvalidToken);
        }

        if !self.identity.access_token_search(access_token).await? {
            warn!(player_id = %claims.player_id, "Access token revoked or unknown");
            return Err(AuthError::RevokedOrNotFound);
        }

        debug!(player_id = %claims.player_id, "Access token accepted");
        Ok(AuthContext {
            player_id: claims.player_id,
            role_code: claims.role_code,
        })
    }

    /// Grant if `role_code` shares a role with `expected`.
    ///
    /// `expected[i]` is 1 when role `i` may use the route. The role count
    /// comes from the identity service on every call.
    pub async fn authorize_roles(&self, role_code: i32, expected: &[u8]) -> Result<(), AuthError> {
        let role_count = self.identity.roles_count().await?;
        check_roles(role_code, role_count, expected).inspect_err(|_| {
            warn!(role_code, role_count, "Role not permitted for route");
        })
    }

    /// The `player_id` path parameter must name the authenticated player.
    pub fn validate_player_param(
        &self,
        path_player_id: &str,
        ctx: &AuthContext,
    ) -> Result<(), AuthError> {
        if path_player_id.is_empty() || ctx.player_id.is_empty() {
            warn!("Player id missing from path or context");
            return Err(AuthError::PermissionDenied);
        }
        if path_player_id != ctx.player_id {
            warn!(path_player_id, player_id = %ctx.player_id, "Player id does not match token");
            return Err(AuthError::PermissionDenied);
        }
        Ok(())
    }

    /// Authorize a gRPC request from its `authorization` metadata and attach
    /// the resulting [`AuthContext`] to its extensions.
    #[allow(clippy::result_large_err)]
    pub async fn authorize_request<T>(&self, req: &mut Request<T>) -> Result<AuthContext, Status> {
        let token = req
            .metadata()
            .get(AUTHORIZATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| Status::unauthenticated("Missing authorization header"))?
            .to_string();

        let ctx = self.authorize_jwt(&token).await?;
        req.extensions_mut().insert(ctx.clone());
        Ok(ctx)
    }
}

/// Extract the context from a request that has passed [`AccessGuard::authorize_request`].
#[allow(clippy::result_large_err)]
pub fn extract_auth_context<T>(req: &Request<T>) -> Result<&AuthContext, Status> {
    req.extensions()
        .get::<AuthContext>()
        .ok_or_else(|| Status::internal("Auth context not found in request extensions"))
}
