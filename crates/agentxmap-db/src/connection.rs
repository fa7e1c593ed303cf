//! SurrealDB connection management.

use std::time::Duration;

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::repository::{
    SurrealInvitationRepository, SurrealOrganizationRepository, SurrealTenantRepository,
    SurrealUserRepository,
};
use crate::schema::run_migrations;

#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket address (e.g., `127.0.0.1:8000`).
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Upper bound on connecting and signing in.
    pub connect_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "agentxmap".into(),
            database: "identity".into(),
            username: "root".into(),
            password: "root".into(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// The repositories backing the identity service, sharing one client.
pub struct IdentityRepositories {
    pub organizations: SurrealOrganizationRepository<Client>,
    pub users: SurrealUserRepository<Client>,
    pub invitations: SurrealInvitationRepository<Client>,
    pub tenants: SurrealTenantRepository<Client>,
}

/// An open, migrated SurrealDB connection.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect, sign in as root, select the configured namespace and
    /// database, and bring the schema up to date.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = tokio::time::timeout(config.connect_timeout, Self::open(config))
            .await
            .map_err(|_| DbError::Connect(format!("timed out after {:?}", config.connect_timeout)))??;

        run_migrations(&db).await?;
        info!("Connected to SurrealDB");

        Ok(Self { db })
    }

    async fn open(config: &DbConfig) -> Result<Surreal<Client>, DbError> {
        let db = Surreal::new::<Ws>(&config.url).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;
        Ok(db)
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }

    pub fn repositories(&self) -> IdentityRepositories {
        IdentityRepositories {
            organizations: SurrealOrganizationRepository::new(self.db.clone()),
            users: SurrealUserRepository::new(self.db.clone()),
            invitations: SurrealInvitationRepository::new(self.db.clone()),
            tenants: SurrealTenantRepository::new(self.db.clone()),
        }
    }
}
