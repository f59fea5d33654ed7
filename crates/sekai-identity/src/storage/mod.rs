//! SQLite storage for the Sekai identity service.
//!
//! Holds the credential records (one per login session) and the role catalog.
//! The identity service is the only writer.

mod db;
mod models;
mod queries;

#[cfg(test)]
mod tests;

pub use db::{CredentialStore, IdentityDatabase};
pub use models::*;
pub use sekai_core::db::DatabaseError;
