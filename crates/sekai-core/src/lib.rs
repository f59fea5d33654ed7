//! Sekai Core Library
//!
//! Shared authentication primitives for every Sekai service:
//! - Signed session and service tokens
//! - Role bitmask checks
//! - Service-to-service trust interceptor
//! - Configuration, logging and store helpers
//! - The common error taxonomy

pub mod config;
pub mod db;
pub mod error;
pub mod rbac;
pub mod rpc;
pub mod service_auth;
pub mod token;
pub mod tracing_init;

pub use config::AuthConfig;
pub use error::{AuthError, Result};
pub use rbac::RoleSet;
pub use token::{Claims, ServiceClaims, TokenCodec, TokenKind};
