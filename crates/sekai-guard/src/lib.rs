//! Sekai Guard
//!
//! Access control for services that sit behind the identity service:
//! - Access-token verification plus the remote liveness check
//! - Role bitmask authorization
//! - Player id path-parameter validation

pub mod identity;
pub mod middleware;

pub use identity::{GrpcIdentityClient, IdentityLookup};
pub use middleware::{AccessGuard, AuthContext, bearer_token};
