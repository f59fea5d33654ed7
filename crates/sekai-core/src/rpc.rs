//! Deadline-bounded unary gRPC calls.
//!
//! The core never retries: a call either answers within its deadline or
//! fails with `DEADLINE_EXCEEDED`, which maps to [`AuthError::RpcTimeout`].

use std::future::Future;
use std::time::Duration;

use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Response, Status};

use crate::error::AuthError;

/// Build a request that also advertises `deadline` to the server (`grpc-timeout`).
pub fn request_with_deadline<T>(message: T, deadline: Duration) -> Request<T> {
    let mut req = Request::new(message);
    req.set_timeout(deadline);
    req
}

/// Await `call`, giving up once `deadline` elapses.
///
/// Dropping the returned future (for example when the parent request is
/// cancelled) drops the in-flight call with it.
pub async fn call_with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, Status>
where
    F: Future<Output = Result<Response<T>, Status>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result.map(Response::into_inner),
        Err(_) => Err(Status::deadline_exceeded(AuthError::RpcTimeout.to_string())),
    }
}

/// Channel to a peer service that connects on first use.
pub fn lazy_channel(url: &str) -> Result<Channel, AuthError> {
    let endpoint = Endpoint::from_shared(url.to_string())
        .map_err(|e| AuthError::Rpc(format!("invalid endpoint {url}: {e}")))?;
    Ok(endpoint.connect_lazy())
}
