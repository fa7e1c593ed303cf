//! SurrealDB implementation of [`UserRepository`].
//!
//! Email addresses are unique across all organizations, enforced by the
//! `idx_user_email` index. Deletes are soft: the row keeps its email so
//! the address cannot be reused by a later account.

use agentxmap_core::error::AgentXmapResult;
use agentxmap_core::models::user::{CreateUser, UpdateUser, User, UserRole};
use agentxmap_core::repository::UserRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

/// DB-side row struct for statements that return the stored record.
#[derive(Debug, SurrealValue)]
struct UserRow {
    organization_id: String,
    email: String,
    password_hash: String,
    role: String,
    first_name: Option<String>,
    last_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    organization_id: String,
    email: String,
    password_hash: String,
    role: String,
    first_name: Option<String>,
    last_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

fn parse_role(raw: &str) -> Result<UserRole, DbError> {
    raw.parse().map_err(|e| DbError::decode("user", e))
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        Ok(User {
            id,
            organization_id: parse_uuid("user", "organization_id", &self.organization_id)?,
            email: self.email,
            password_hash: self.password_hash,
            role: parse_role(&self.role)?,
            first_name: self.first_name,
            last_name: self.last_name,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid("user", "id", &self.record_id)?,
            organization_id: parse_uuid("user", "organization_id", &self.organization_id)?,
            email: self.email,
            password_hash: self.password_hash,
            role: parse_role(&self.role)?,
            first_name: self.first_name,
            last_name: self.last_name,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

/// Load a live user by id.
pub(crate) async fn fetch_by_id<C: Connection>(db: &Surreal<C>, id: Uuid) -> Result<User, DbError> {
    let id_str = id.to_string();

    let mut result = db
        .query(
            "SELECT * FROM type::record('user', $id) \
             WHERE deleted_at IS NONE",
        )
        .bind(("id", id_str.clone()))
        .await?;

    let rows: Vec<UserRow> = result.take(0)?;
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?
        .into_user(id)
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> AgentXmapResult<User> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('user', $id) SET \
                 organization_id = $organization_id, \
                 email = $email, \
                 password_hash = $password_hash, \
                 role = $role, \
                 first_name = $first_name, \
                 last_name = $last_name",
            )
            .bind(("id", id.to_string()))
            .bind(("organization_id", input.organization_id.to_string()))
            .bind(("email", input.email))
            .bind(("password_hash", input.password_hash))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_write)?;

        Ok(fetch_by_id(&self.db, id).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> AgentXmapResult<User> {
        Ok(fetch_by_id(&self.db, id).await?)
    }

    async fn get_by_email(&self, email: &str) -> AgentXmapResult<User> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM user \
                 WHERE email = $email AND deleted_at IS NONE",
            )
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: format!("email={email}"),
        })?;

        Ok(row.try_into_user()?)
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> AgentXmapResult<User> {
        let mut sets = Vec::new();
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.password_hash.is_some() {
            sets.push("password_hash = $password_hash");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {} \
             WHERE deleted_at IS NONE",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));

        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(password_hash) = input.password_hash {
            builder = builder.bind(("password_hash", password_hash));
        }
        if let Some(role) = input.role {
            builder = builder.bind(("role", role.as_str().to_string()));
        }
        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_write)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id.to_string(),
        })?;

        Ok(row.into_user(id)?)
    }

    async fn delete(&self, id: Uuid) -> AgentXmapResult<()> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 deleted_at = time::now(), updated_at = time::now() \
                 WHERE deleted_at IS NONE",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_write)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "user".into(),
                id: id.to_string(),
            }
            .into());
        }

        Ok(())
    }
}
