//! Sekai Protocol Buffers
//!
//! Generated protobuf code for the internal gRPC API.
//!
//! This crate contains:
//! - `IdentityService` for session lifecycle, token liveness and role count
//! - `PlayerService` for the player directory lookups the identity service consumes

#![allow(clippy::derive_partial_eq_without_eq)]

/// Sekai v1 API definitions.
///
/// All generated types and services are included here.
pub mod v1 {
    tonic::include_proto!("sekai.v1");
}

// Re-export v1 as the default API version for convenience
pub use v1::*;
