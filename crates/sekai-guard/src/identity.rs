//! Client side of the identity service, as seen by access control.

use std::time::Duration;

use tonic::service::interceptor::InterceptedService;
use tonic::transport::Channel;
use tracing::warn;

use sekai_core::AuthError;
use sekai_core::rpc::{call_with_deadline, lazy_channel, request_with_deadline};
use sekai_core::service_auth::ServiceTokenInjector;
use sekai_proto::v1::identity_service_client::IdentityServiceClient;
use sekai_proto::v1::{AccessTokenSearchRequest, RolesCountRequest};

/// The two identity queries access control depends on.
#[tonic::async_trait]
pub trait IdentityLookup: Send + Sync {
    /// Whether `access_token` still belongs to a live session.
    async fn access_token_search(&self, access_token: &str) -> Result<bool, AuthError>;

    /// Number of role definitions, which sizes the role bitmask.
    async fn roles_count(&self) -> Result<i64, AuthError>;
}

type IdentityClient = IdentityServiceClient<InterceptedService<Channel, ServiceTokenInjector>>;

/// gRPC client for the identity service. Every call carries a service token
/// and gives up after `deadline`.
#[derive(Clone)]
pub struct GrpcIdentityClient {
    client: IdentityClient,
    deadline: Duration,
}

impl GrpcIdentityClient {
    pub fn connect_lazy(
        url: &str,
        injector: ServiceTokenInjector,
        deadline: Duration,
    ) -> Result<Self, AuthError> {
        let channel = lazy_channel(url)?;
        Ok(Self::new(channel, injector, deadline))
    }

    pub fn new(channel: Channel, injector: ServiceTokenInjector, deadline: Duration) -> Self {
        Self {
            client: IdentityServiceClient::with_interceptor(channel, injector),
            deadline,
        }
    }
}

#[tonic::async_trait]
impl IdentityLookup for GrpcIdentityClient {
    async fn access_token_search(&self, access_token: &str) -> Result<bool, AuthError> {
        let mut client = self.client.clone();
        let req = request_with_deadline(
            AccessTokenSearchRequest {
                access_token: access_token.to_string(),
            },
            self.deadline,
        );

        let resp = call_with_deadline(self.deadline, client.access_token_search(req))
            .await
            .map_err(|status| {
                warn!(code = ?status.code(), "AccessTokenSearch failed");
                AuthError::from(status)
            })?;
        Ok(resp.is_valid)
    }

    async fn roles_count(&self) -> Result<i64, AuthError> {
        let mut client = self.client.clone();
        let req = request_with_deadline(RolesCountRequest {}, self.deadline);

        let resp = call_with_deadline(self.deadline, client.roles_count(req))
            .await
            .map_err(|status| {
                warn!(code = ?status.code(), "RolesCount failed");
                AuthError::from(status)
            })?;
        Ok(resp.count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use sekai_core::TokenCodec;
    use tokio::net::TcpListener;

    /// Accepts TCP connections and never answers.
    async fn silent_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{addr}")
    }

    fn injector() -> ServiceTokenInjector {
        ServiceTokenInjector::new(Arc::new(TokenCodec::new(b"internal")), "inventory", 60)
    }

    #[tokio::test]
    async fn silent_identity_service_times_out() {
        let url = silent_server().await;
        let client = GrpcIdentityClient::connect_lazy(&url, injector(), Duration::from_millis(200))
            .unwrap();

        assert_eq!(
            client.access_token_search("token").await.unwrap_err(),
            AuthError::RpcTimeout
        );
        assert_eq!(
            client.roles_count().await.unwrap_err(),
            AuthError::RpcTimeout
        );
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(matches!(
            GrpcIdentityClient::connect_lazy("not a url", injector(), Duration::from_secs(1)),
            Err(AuthError::Rpc(_))
        ));
    }
}
