//! Service-to-service trust for gRPC calls.
//!
//! Inbound: [`service_auth_interceptor`] rejects any call whose `auth`
//! metadata header does not carry a service token signed with the shared
//! internal secret. Outbound: [`ServiceTokenInjector`] signs a fresh token
//! for each call.

use std::sync::Arc;

use tonic::metadata::MetadataValue;
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::token::{ServiceClaims, TokenCodec};

/// Metadata key that carries the service token.
pub const SERVICE_AUTH_HEADER: &str = "auth";

/// Verify the service token on every inbound call before it reaches a handler.
pub fn service_auth_interceptor(
    codec: Arc<TokenCodec>,
) -> impl Fn(Request<()>) -> Result<Request<()>, Status> + Clone {
    move |mut req: Request<()>| {
        let token = req
            .metadata()
            .get(SERVICE_AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                warn!("Rejected inbound call without service token");
                Status::from(AuthError::MissingServiceToken)
            })?;

        let claims = codec.parse_service(token).map_err(|e| {
            warn!(error = %e, "Rejected inbound call with bad service token");
            Status::from(e)
        })?;

        debug!(service = %claims.service, "Service token verified");
        req.extensions_mut().insert(claims);
        Ok(req)
    }
}

/// Extract the caller's service claims from a request that passed the interceptor.
#[allow(clippy::result_large_err)]
pub fn extract_service_claims<T>(req: &Request<T>) -> Result<&ServiceClaims, Status> {
    req.extensions()
        .get::<ServiceClaims>()
        .ok_or_else(|| Status::internal("Service claims not found in request extensions"))
}

/// Client-side interceptor that attaches a freshly signed service token.
#[derive(Clone)]
pub struct ServiceTokenInjector {
    codec: Arc<TokenCodec>,
    service: Arc<str>,
    ttl_secs: i64,
}

impl ServiceTokenInjector {
    pub fn new(codec: Arc<TokenCodec>, service: &str, ttl_secs: i64) -> Self {
        Self {
            codec,
            service: Arc::from(service),
            ttl_secs,
        }
    }
}

impl Interceptor for ServiceTokenInjector {
    fn call(&mut self, mut req: Request<()>) -> Result<Request<()>, Status> {
        let token = self.codec.issue_service(self.ttl_secs, &self.service)?;
        let value = MetadataValue::try_from(token)
            .map_err(|_| Status::internal("Service token is not valid metadata"))?;
        req.metadata_mut().insert(SERVICE_AUTH_HEADER, value);
        Ok(req)
    }
}
