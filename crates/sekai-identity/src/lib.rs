//! Sekai Identity Service Library
//!
//! Core functionality for the identity service:
//! - SQLite credential store (one record per login session) and role catalog
//! - Session lifecycle: login, refresh, logout
//! - Token liveness and role-count lookups for other services
//! - gRPC surface behind the service-to-service trust interceptor

pub mod player;
pub mod server;
pub mod session;
pub mod storage;
