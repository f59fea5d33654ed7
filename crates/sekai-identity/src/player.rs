//! Player directory lookups consumed by the identity service.
//!
//! The directory is owned by the player service; the identity service only
//! asks it to resolve credentials at login and to re-read a profile at
//! refresh.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tonic::Code;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Channel;
use tracing::warn;

use sekai_core::AuthError;
use sekai_core::rpc::{call_with_deadline, lazy_channel, request_with_deadline};
use sekai_core::service_auth::ServiceTokenInjector;
use sekai_core::token::bare_player_id;
use sekai_proto::v1::player_service_client::PlayerServiceClient;
use sekai_proto::v1::{
    CredentialSearchRequest, FindOnePlayerProfileToRefreshRequest, PlayerProfile,
};

#[tonic::async_trait]
pub trait PlayerDirectory: Send + Sync {
    /// Resolve an email/password pair. Mismatch is `InvalidCredentials`.
    async fn credential_search(
        &self,
        email: &str,
        password: &str,
    ) -> Result<PlayerProfile, AuthError>;

    /// Current profile of a bare player id. Failure is `ProfileLookup`.
    async fn find_profile_for_refresh(&self, player_id: &str) -> Result<PlayerProfile, AuthError>;
}

type PlayerClient = PlayerServiceClient<InterceptedService<Channel, ServiceTokenInjector>>;

/// gRPC client for the player service. Every call carries a service token.
#[derive(Clone)]
pub struct GrpcPlayerDirectory {
    client: PlayerClient,
    deadline: Duration,
}

impl GrpcPlayerDirectory {
    /// Connect lazily to `url`; the first call opens the connection.
    pub fn connect_lazy(
        url: &str,
        injector: ServiceTokenInjector,
        deadline: Duration,
    ) -> Result<Self, AuthError> {
        let channel = lazy_channel(url)?;
        Ok(Self {
            client: PlayerServiceClient::with_interceptor(channel, injector),
            deadline,
        })
    }
}

#[tonic::async_trait]
impl PlayerDirectory for GrpcPlayerDirectory {
    async fn credential_search(
        &self,
        email: &str,
        password: &str,
    ) -> Result<PlayerProfile, AuthError> {
        let mut client = self.client.clone();
        let req = request_with_deadline(
            CredentialSearchRequest {
                email: email.to_string(),
                password: password.to_string(),
            },
            self.deadline,
        );

        call_with_deadline(self.deadline, client.credential_search(req))
            .await
            .map_err(|status| {
                warn!(code = ?status.code(), detail = status.message(), "CredentialSearch failed");
                match status.code() {
                    Code::Unauthenticated
                    | Code::NotFound
                    | Code::InvalidArgument
                    | Code::PermissionDenied => AuthError::InvalidCredentials,
                    Code::DeadlineExceeded => AuthError::RpcTimeout,
                    _ => AuthError::Rpc(status.message().to_string()),
                }
            })
    }

    async fn find_profile_for_refresh(&self, player_id: &str) -> Result<PlayerProfile, AuthError> {
        let mut client = self.client.clone();
        let req = request_with_deadline(
            FindOnePlayerProfileToRefreshRequest {
                player_id: player_id.to_string(),
            },
            self.deadline,
        );

        call_with_deadline(
            self.deadline,
            client.find_one_player_profile_to_refresh(req),
        )
        .await
        .map_err(|status| {
            warn!(code = ?status.code(), player_id, "FindOnePlayerProfileToRefresh failed");
            match status.code() {
                Code::DeadlineExceeded => AuthError::RpcTimeout,
                _ => AuthError::ProfileLookup(status.message().to_string()),
            }
        })
    }
}

struct DirectoryEntry {
    password: String,
    profile: PlayerProfile,
}

/// Fixed player table held in memory, for tests and local development.
#[derive(Default)]
pub struct InMemoryPlayerDirectory {
    players: RwLock<HashMap<String, DirectoryEntry>>,
}

impl InMemoryPlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player keyed by its bare id.
    pub async fn insert(&self, id: &str, email: &str, password: &str, role_code: i32) {
        let now = sekai_core::db::unix_timestamp();
        let entry = DirectoryEntry {
            password: password.to_string(),
            profile: PlayerProfile {
                id: id.to_string(),
                email: email.to_string(),
                username: email.split('@').next().unwrap_or(email).to_string(),
                role_code,
                created_at: now,
                updated_at: now,
            },
        };
        self.players.write().await.insert(id.to_string(), entry);
    }

    /// Change a player's role, as an administrator would in the player service.
    pub async fn set_role(&self, id: &str, role_code: i32) {
        if let Some(entry) = self.players.write().await.get_mut(id) {
            entry.profile.role_code = role_code;
            entry.profile.updated_at = sekai_core::db::unix_timestamp();
        }
    }

    pub async fn remove(&self, id: &str) {
        self.players.write().await.remove(id);
    }
}

#[tonic::async_trait]
impl PlayerDirectory for InMemoryPlayerDirectory {
    async fn credential_search(
        &self,
        email: &str,
        password: &str,
    ) -> Result<PlayerProfile, AuthError> {
        self.players
            .read()
            .await
            .values()
            .find(|entry| entry.profile.email == email && entry.password == password)
            .map(|entry| entry.profile.clone())
            .ok_or(AuthError::InvalidCredentials)
    }

    async fn find_profile_for_refresh(&self, player_id: &str) -> Result<PlayerProfile, AuthError> {
        self.players
            .read()
            .await
            .get(bare_player_id(player_id))
            .map(|entry| entry.profile.clone())
            .ok_or_else(|| AuthError::ProfileLookup(format!("player {player_id} not found")))
    }
}
