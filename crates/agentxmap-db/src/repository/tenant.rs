//! SurrealDB implementation of [`TenantRepository`].
//!
//! The organization and its first admin are written in one transaction,
//! so a failure on either record leaves neither behind.

use agentxmap_core::error::AgentXmapResult;
use agentxmap_core::models::tenant::{CreateTenant, Tenant};
use agentxmap_core::repository::TenantRepository;
use surrealdb::{Connection, Surreal};
use tracing::debug;
use uuid::Uuid;

use super::{organization, user};
use crate::error::DbError;

const CREATE_TENANT: &str = "\
BEGIN TRANSACTION;
CREATE type::record('organization', $org_id) SET \
    name = $org_name, slug = $org_slug;
CREATE type::record('user', $user_id) SET \
    organization_id = $org_id, \
    email = $email, \
    password_hash = $password_hash, \
    role = $role, \
    first_name = $first_name, \
    last_name = $last_name;
COMMIT TRANSACTION;
";

/// SurrealDB implementation of the Tenant repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn create_tenant(&self, input: CreateTenant) -> AgentXmapResult<Tenant> {
        let CreateTenant {
            organization: org,
            admin,
        } = input;

        if organization::fetch_by_slug(&self.db, &org.slug).await?.is_some() {
            return Err(DbError::Duplicate {
                entity: "organization".into(),
            }
            .into());
        }

        let org_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let mut response = self
            .db
            .query(CREATE_TENANT)
            .bind(("org_id", org_id.to_string()))
            .bind(("org_name", org.name))
            .bind(("org_slug", org.slug))
            .bind(("user_id", user_id.to_string()))
            .bind(("email", admin.email))
            .bind(("password_hash", admin.password_hash))
            .bind(("role", admin.role.as_str().to_string()))
            .bind(("first_name", admin.first_name))
            .bind(("last_name", admin.last_name))
            .await
            .map_err(DbError::from)?;

        let errors = response.take_errors();
        if !errors.is_empty() {
            return Err(DbError::from_transaction(errors).into());
        }

        let organization = organization::fetch_by_id(&self.db, org_id).await?;
        let admin = user::fetch_by_id(&self.db, user_id).await?;

        debug!(
            organization_id = %organization.id,
            admin_id = %admin.id,
            "Tenant committed"
        );

        Ok(Tenant {
            organization,
            admin,
        })
    }
}
