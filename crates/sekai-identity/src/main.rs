//! Sekai Identity Server
//!
//! gRPC service that owns player sessions: login, token refresh, logout and
//! the access-token liveness check used by every other service.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tonic::transport::Server;
use tracing::{info, warn};

use sekai_core::TokenCodec;
use sekai_core::config::AuthConfig;
use sekai_core::service_auth::{ServiceTokenInjector, service_auth_interceptor};
use sekai_core::tracing_init::init_tracing;
use sekai_proto::v1::identity_service_server::IdentityServiceServer;

use sekai_identity::player::GrpcPlayerDirectory;
use sekai_identity::server::IdentityServiceImpl;
use sekai_identity::session::SessionManager;
use sekai_identity::storage::{CredentialStore, IdentityDatabase};

#[derive(Parser, Debug)]
#[command(name = "sekai-identity")]
#[command(
    version,
    about = "Sekai identity service - sessions, credentials and token liveness"
)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "SEKAI_IDENTITY_ADDR", default_value = "0.0.0.0:1441")]
    addr: SocketAddr,

    /// Path to SQLite database file.
    #[arg(long, env = "SEKAI_IDENTITY_DB")]
    db_path: Option<PathBuf>,

    /// JSON config file. Flags and environment variables override it.
    #[arg(long, env = "SEKAI_CONFIG")]
    config: Option<PathBuf>,

    /// Secret for access tokens.
    #[arg(long, env = "SEKAI_ACCESS_SECRET", hide_env_values = true)]
    access_secret: Option<String>,

    /// Secret for refresh tokens.
    #[arg(long, env = "SEKAI_REFRESH_SECRET", hide_env_values = true)]
    refresh_secret: Option<String>,

    /// Shared secret for service-to-service tokens.
    #[arg(long, env = "SEKAI_API_SECRET", hide_env_values = true)]
    api_secret: Option<String>,

    /// Access token TTL in seconds.
    #[arg(long, env = "SEKAI_ACCESS_TTL")]
    access_ttl: Option<i64>,

    /// Refresh token TTL in seconds.
    #[arg(long, env = "SEKAI_REFRESH_TTL")]
    refresh_ttl: Option<i64>,

    /// Player service address.
    #[arg(long, env = "SEKAI_PLAYER_URL")]
    player_url: Option<String>,

    /// Player service call timeout in seconds.
    #[arg(long, env = "SEKAI_PLAYER_TIMEOUT")]
    player_timeout: Option<u64>,

    /// Credential store operation timeout in seconds.
    #[arg(long, env = "SEKAI_STORE_TIMEOUT")]
    store_timeout: Option<u64>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "SEKAI_LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<(AuthConfig, Option<PathBuf>, SocketAddr)> {
        let mut config = match &self.config {
            Some(path) => AuthConfig::load_file(path)?,
            None => AuthConfig::default(),
        };

        let jwt = &mut config.jwt;
        if let Some(secret) = self.access_secret {
            jwt.access_secret = secret;
        }
        if let Some(secret) = self.refresh_secret {
            jwt.refresh_secret = secret;
        }
        if let Some(secret) = self.api_secret {
            jwt.api_secret = secret;
        }
        if let Some(ttl) = self.access_ttl {
            jwt.access_ttl_secs = ttl;
        }
        if let Some(ttl) = self.refresh_ttl {
            jwt.refresh_ttl_secs = ttl;
        }
        if let Some(url) = self.player_url {
            config.grpc.player_url = url;
        }
        if let Some(secs) = self.player_timeout {
            config.timeouts.player_rpc_secs = secs;
        }
        if let Some(secs) = self.store_timeout {
            config.timeouts.store_secs = secs;
        }
        if self.log_json {
            config.log.json = true;
        }

        Ok((config, self.db_path, self.addr))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (mut config, db_path, addr) = Args::parse().into_config()?;
    init_tracing(&config.log);

    for name in config.jwt.fill_dev_secrets() {
        warn!(secret = name, "Token secret not configured, using development default");
    }
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        "Starting sekai-identity"
    );

    let db_path = match db_path {
        Some(path) => path,
        None => default_db_path()?,
    };
    info!(path = %db_path.display(), "Opening identity database");
    let db = IdentityDatabase::open(&db_path).await?;
    let store = CredentialStore::new(db, config.timeouts.store());
    let roles = store.list_roles().await?;
    info!(
        roles = ?roles.iter().map(|r| r.title.as_str()).collect::<Vec<_>>(),
        "Role catalog loaded"
    );

    let api_codec = Arc::new(TokenCodec::new(config.jwt.api_secret.as_bytes()));
    let injector = ServiceTokenInjector::new(
        Arc::clone(&api_codec),
        "identity",
        config.jwt.service_token_ttl_secs,
    );
    let players = GrpcPlayerDirectory::connect_lazy(
        &config.grpc.player_url,
        injector,
        config.timeouts.player_rpc(),
    )?;
    info!(url = %config.grpc.player_url, "Player directory configured");

    let sessions = Arc::new(SessionManager::new(store, Arc::new(players), &config.jwt));
    let identity = IdentityServiceImpl::new(sessions);

    let grpc_router = Server::builder()
        .http2_keepalive_interval(Some(Duration::from_secs(30)))
        .http2_keepalive_timeout(Some(Duration::from_secs(10)))
        .add_service(IdentityServiceServer::with_interceptor(
            identity,
            service_auth_interceptor(api_codec),
        ));

    info!(addr = %addr, "Identity server listening");
    tokio::select! {
        result = grpc_router.serve(addr) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Identity server stopped");
    Ok(())
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".sekai").join("identity.db"))
}
