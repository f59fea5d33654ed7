//! Configuration for the authentication core.
//!
//! Nothing here is global: binaries build one [`AuthConfig`] (from a JSON
//! file, then CLI flags and `SEKAI_*` environment variables) and hand each
//! component the parts it needs.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Complete authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub grpc: GrpcConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Token secrets and lifetimes.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    /// Shared secret for service-to-service tokens.
    pub api_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub service_token_ttl_secs: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            refresh_secret: String::new(),
            api_secret: String::new(),
            access_ttl_secs: 3600,
            refresh_ttl_secs: 7 * 24 * 60 * 60, // 7 days
            service_token_ttl_secs: 60,
        }
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("service_token_ttl_secs", &self.service_token_ttl_secs)
            .finish()
    }
}

impl JwtConfig {
    /// Fill unset secrets with development values, one distinct value per
    /// secret. Returns the names of the secrets that were filled.
    pub fn fill_dev_secrets(&mut self) -> Vec<&'static str> {
        let mut filled = Vec::new();
        for (name, secret, dev) in [
            ("access_secret", &mut self.access_secret, "dev-access-secret-change-me"),
            ("refresh_secret", &mut self.refresh_secret, "dev-refresh-secret-change-me"),
            ("api_secret", &mut self.api_secret, "dev-api-secret-change-me"),
        ] {
            if secret.is_empty() {
                *secret = dev.to_string();
                filled.push(name);
            }
        }
        filled
    }
}

/// Peer addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrpcConfig {
    pub identity_url: String,
    pub player_url: String,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            identity_url: "http://127.0.0.1:1441".to_string(),
            player_url: "http://127.0.0.1:1442".to_string(),
        }
    }
}

/// Deadlines for every I/O the core performs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Liveness check and role-count fetch.
    pub identity_rpc_secs: u64,
    /// Player directory lookups.
    pub player_rpc_secs: u64,
    /// Single credential store operation.
    pub store_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            identity_rpc_secs: 10,
            player_rpc_secs: 30,
            store_secs: 10,
        }
    }
}

impl TimeoutConfig {
    pub const fn identity_rpc(&self) -> Duration {
        Duration::from_secs(self.identity_rpc_secs)
    }

    pub const fn player_rpc(&self) -> Duration {
        Duration::from_secs(self.player_rpc_secs)
    }

    pub const fn store(&self) -> Duration {
        Duration::from_secs(self.store_secs)
    }
}

/// Logging output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default `RUST_LOG` filter when the env-var is not set.
    pub filter: String,
    /// Emit structured JSON lines instead of the human-readable format.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl AuthConfig {
    /// Load a JSON config file. Missing sections fall back to defaults.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Reject configurations that cannot issue or verify tokens.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let jwt = &self.jwt;
        for (name, secret) in [
            ("access_secret", &jwt.access_secret),
            ("refresh_secret", &jwt.refresh_secret),
            ("api_secret", &jwt.api_secret),
        ] {
            if secret.is_empty() {
                return Err(ConfigError::Invalid(format!("jwt.{name} must be set")));
            }
        }

        // A service holding the internal secret must not be able to mint player tokens.
        if jwt.api_secret == jwt.access_secret || jwt.api_secret == jwt.refresh_secret {
            return Err(ConfigError::Invalid(
                "jwt.api_secret must differ from the player token secrets".to_string(),
            ));
        }

        if jwt.access_ttl_secs <= 0 || jwt.refresh_ttl_secs <= 0 || jwt.service_token_ttl_secs <= 0
        {
            return Err(ConfigError::Invalid(
                "token TTLs must be positive".to_string(),
            ));
        }

        if jwt.refresh_ttl_secs < jwt.access_ttl_secs {
            return Err(ConfigError::Invalid(
                "jwt.refresh_ttl_secs must not be shorter than jwt.access_ttl_secs".to_string(),
            ));
        }

        Ok(())
    }
}
