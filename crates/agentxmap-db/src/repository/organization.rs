//! SurrealDB implementation of [`OrganizationRepository`].

use agentxmap_core::error::AgentXmapResult;
use agentxmap_core::models::organization::{CreateOrganization, Organization};
use agentxmap_core::repository::OrganizationRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct OrganizationRow {
    record_id: String,
    name: String,
    slug: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl OrganizationRow {
    fn try_into_organization(self) -> Result<Organization, DbError> {
        Ok(Organization {
            id: parse_uuid("organization", "id", &self.record_id)?,
            name: self.name,
            slug: self.slug,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

/// Load a live organization by id.
pub(crate) async fn fetch_by_id<C: Connection>(
    db: &Surreal<C>,
    id: Uuid,
) -> Result<Organization, DbError> {
    let id_str = id.to_string();

    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, * \
             FROM type::record('organization', $id) \
             WHERE deleted_at IS NONE",
        )
        .bind(("id", id_str.clone()))
        .await?;

    let rows: Vec<OrganizationRow> = result.take(0)?;
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "organization".into(),
            id: id_str,
        })?
        .try_into_organization()
}

/// Load a live organization by slug.
pub(crate) async fn fetch_by_slug<C: Connection>(
    db: &Surreal<C>,
    slug: &str,
) -> Result<Option<Organization>, DbError> {
    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, * \
             FROM organization \
             WHERE slug = $slug AND deleted_at IS NONE",
        )
        .bind(("slug", slug.to_string()))
        .await?;

    let rows: Vec<OrganizationRow> = result.take(0)?;
    rows.into_iter()
        .next()
        .map(OrganizationRow::try_into_organization)
        .transpose()
}

/// SurrealDB implementation of the Organization repository.
#[derive(Clone)]
pub struct SurrealOrganizationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrganizationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OrganizationRepository for SurrealOrganizationRepository<C> {
    async fn create(&self, input: CreateOrganization) -> AgentXmapResult<Organization> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('organization', $id) SET \
                 name = $name, slug = $slug",
            )
            .bind(("id", id.to_string()))
            .bind(("name", input.name))
            .bind(("slug", input.slug))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_write)?;

        Ok(fetch_by_id(&self.db, id).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> AgentXmapResult<Organization> {
        Ok(fetch_by_id(&self.db, id).await?)
    }

    async fn get_by_slug(&self, slug: &str) -> AgentXmapResult<Organization> {
        let org = fetch_by_slug(&self.db, slug)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "organization".into(),
                id: format!("slug={slug}"),
            })?;
        Ok(org)
    }
}
