//! SurrealDB implementation of [`InvitationRepository`].

use agentxmap_core::error::AgentXmapResult;
use agentxmap_core::models::invitation::{CreateInvitation, Invitation, InvitationStatus};
use agentxmap_core::models::user::UserRole;
use agentxmap_core::repository::InvitationRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct InvitationRow {
    organization_id: String,
    invitor_id: String,
    email: String,
    token: String,
    role: String,
    status: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct InvitationRowWithId {
    record_id: String,
    organization_id: String,
    invitor_id: String,
    email: String,
    token: String,
    role: String,
    status: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(raw: &str) -> Result<InvitationStatus, DbError> {
    raw.parse().map_err(|e| DbError::decode("invitation", e))
}

fn parse_role(raw: &str) -> Result<UserRole, DbError> {
    raw.parse().map_err(|e| DbError::decode("invitation", e))
}

impl InvitationRow {
    fn into_invitation(self, id: Uuid) -> Result<Invitation, DbError> {
        Ok(Invitation {
            id,
            organization_id: parse_uuid("invitation", "organization_id", &self.organization_id)?,
            invitor_id: parse_uuid("invitation", "invitor_id", &self.invitor_id)?,
            email: self.email,
            token: self.token,
            role: parse_role(&self.role)?,
            status: parse_status(&self.status)?,
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl InvitationRowWithId {
    fn try_into_invitation(self) -> Result<Invitation, DbError> {
        let id = parse_uuid("invitation", "id", &self.record_id)?;
        InvitationRow {
            organization_id: self.organization_id,
            invitor_id: self.invitor_id,
            email: self.email,
            token: self.token,
            role: self.role,
            status: self.status,
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_invitation(id)
    }
}

/// SurrealDB implementation of the Invitation repository.
#[derive(Clone)]
pub struct SurrealInvitationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealInvitationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, id: Uuid) -> Result<Invitation, DbError> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('invitation', $id)")
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<InvitationRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound {
                entity: "invitation".into(),
                id: id_str,
            })?
            .into_invitation(id)
    }
}

impl<C: Connection> InvitationRepository for SurrealInvitationRepository<C> {
    async fn create(&self, input: CreateInvitation) -> AgentXmapResult<Invitation> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "CREATE type::record('invitation', $id) SET \
                 organization_id = $organization_id, \
                 invitor_id = $invitor_id, \
                 email = $email, \
                 token = $invitation_token, \
                 role = $role, \
                 status = 'pending', \
                 expires_at = $expires_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("organization_id", input.organization_id.to_string()))
            .bind(("invitor_id", input.invitor_id.to_string()))
            .bind(("email", input.email))
            .bind(("invitation_token", input.token))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_write)?;

        let rows: Vec<InvitationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "invitation".into(),
            id: id_str,
        })?;

        Ok(row.into_invitation(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> AgentXmapResult<Invitation> {
        Ok(self.fetch(id).await?)
    }

    async fn get_by_token(&self, token: &str) -> AgentXmapResult<Invitation> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM invitation WHERE token = $invitation_token",
            )
            .bind(("invitation_token", token.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InvitationRowWithId> = result.take(0).map_err(DbError::from)?;
        // The token itself never goes into the error.
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "invitation".into(),
            id: "token".into(),
        })?;

        Ok(row.try_into_invitation()?)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> AgentXmapResult<Invitation> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('invitation', $id) SET \
                 status = $to, updated_at = time::now() \
                 WHERE status = $from",
            )
            .bind(("id", id.to_string()))
            .bind(("from", from.as_str().to_string()))
            .bind(("to", to.as_str().to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_write)?;

        let rows: Vec<InvitationRow> = result.take(0).map_err(DbError::from)?;
        if let Some(row) = rows.into_iter().next() {
            return Ok(row.into_invitation(id)?);
        }

        // Nothing matched: either the record is gone or another writer
        // moved it first.
        let current = self.fetch(id).await?;
        debug!(
            invitation_id = %id,
            expected = %from,
            actual = %current.status,
            "Invitation status compare-and-set lost"
        );
        Err(DbError::Conflict {
            entity: "invitation".into(),
            reason: format!("expected status {from}, found {}", current.status),
        }
        .into())
    }
}
