//! agentxmap Server: application entry point.
//!
//! Connects to SurrealDB, applies migrations, provisions the configured
//! initial admin and then runs until interrupted.

mod bootstrap;
mod config;

use agentxmap_auth::{AuthError, IdentityService};
use agentxmap_core::RequestContext;
use agentxmap_db::{DbError, DbManager};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, ServerConfig};

const DEFAULT_LOG_FILTER: &str = "agentxmap=info";

#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Identity(#[from] AuthError),

    #[error("signal handler failed: {0}")]
    Signal(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // A missing .env file is fine.
    let dotenv = dotenvy::dotenv();

    let filter = EnvFilter::try_from_env("AGENTXMAP_LOG")
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    info!("Starting agentxmap server...");

    let config = ServerConfig::from_env()?;

    let db = DbManager::connect(&config.db).await?;
    let repos = db.repositories();
    let service = IdentityService::new(
        repos.users,
        repos.invitations,
        repos.tenants,
        config.identity.clone(),
    )?;

    match &config.initial_admin {
        Some(admin) => {
            bootstrap::ensure_initial_admin(&service, &RequestContext::background(), admin)
                .await;
        }
        None => warn!("No initial admin configured"),
    }

    info!("agentxmap server ready");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    info!("agentxmap server stopped.");
    Ok(())
}
