//! IdentityService gRPC implementation.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{debug, instrument};

use sekai_core::service_auth::extract_service_claims;
use sekai_core::token::namespaced_player_id;
use sekai_proto::v1::identity_service_server::IdentityService;
use sekai_proto::v1::{
    AccessTokenSearchRequest, AccessTokenSearchResponse, Credential as CredentialMessage,
    LoginRequest, LogoutRequest, LogoutResponse, RefreshTokenRequest, RolesCountRequest,
    RolesCountResponse, SessionResponse,
};

use crate::session::{Session, SessionManager};
use crate::storage::Credential;

pub struct IdentityServiceImpl {
    sessions: Arc<SessionManager>,
}

impl IdentityServiceImpl {
    pub const fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }
}

/// Name of the calling service, when the trust interceptor ran.
fn caller<T>(request: &Request<T>) -> &str {
    extract_service_claims(request)
        .map(|claims| claims.service.as_str())
        .unwrap_or("unknown")
}

fn credential_message(credential: Credential) -> CredentialMessage {
    CredentialMessage {
        player_id: namespaced_player_id(&credential.player_id),
        id: credential.id,
        role_code: credential.role_code,
        access_token: credential.access_token,
        refresh_token: credential.refresh_token,
        created_at: credential.created_at,
        updated_at: credential.updated_at,
    }
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            profile: Some(session.profile),
            credential: Some(credential_message(session.credential)),
        }
    }
}

#[tonic::async_trait]
impl IdentityService for IdentityServiceImpl {
    #[instrument(skip(self, request), fields(rpc = "AccessTokenSearch"))]
    async fn access_token_search(
        &self,
        request: Request<AccessTokenSearchRequest>,
    ) -> Result<Response<AccessTokenSearchResponse>, Status> {
        debug!(caller = caller(&request), "Access token liveness check");
        let req = request.into_inner();

        let is_valid = self.sessions.access_token_search(&req.access_token).await?;
        Ok(Response::new(AccessTokenSearchResponse { is_valid }))
    }

    #[instrument(skip(self, request), fields(rpc = "RolesCount"))]
    async fn roles_count(
        &self,
        request: Request<RolesCountRequest>,
    ) -> Result<Response<RolesCountResponse>, Status> {
        debug!(caller = caller(&request), "Role count requested");
        let count = self.sessions.role_count().await?;
        Ok(Response::new(RolesCountResponse { count }))
    }

    #[instrument(skip(self, request), fields(rpc = "Login"))]
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<SessionResponse>, Status> {
        let req = request.into_inner();
        if req.email.is_empty() || req.password.is_empty() {
            return Err(Status::invalid_argument("Email and password are required"));
        }

        let session = self.sessions.login(&req.email, &req.password).await?;
        Ok(Response::new(session.into()))
    }

    #[instrument(skip(self, request), fields(rpc = "RefreshToken"))]
    async fn refresh_token(
        &self,
        request: Request<RefreshTokenRequest>,
    ) -> Result<Response<SessionResponse>, Status> {
        let req = request.into_inner();
        if req.credential_id.is_empty() {
            return Err(Status::invalid_argument("credential_id is required"));
        }

        let session = self
            .sessions
            .refresh(&req.refresh_token, &req.credential_id)
            .await?;
        Ok(Response::new(session.into()))
    }

    #[instrument(skip(self, request), fields(rpc = "Logout"))]
    async fn logout(
        &self,
        request: Request<LogoutRequest>,
    ) -> Result<Response<LogoutResponse>, Status> {
        let req = request.into_inner();
        let deleted_count = self.sessions.logout(&req.credential_id).await?;
        Ok(Response::new(LogoutResponse { deleted_count }))
    }
}
