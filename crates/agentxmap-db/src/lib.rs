//! agentxmap Database: SurrealDB connection management and repository
//! implementations.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`]), which applies
//!   migrations on connect
//! - Schema initialization and migrations ([`run_migrations`])
//! - Error types ([`DbError`])
//! - Implementations of the `agentxmap-core` repository traits
//!   ([`repository`])

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager, IdentityRepositories};
pub use error::DbError;
pub use repository::{
    SurrealInvitationRepository, SurrealOrganizationRepository, SurrealTenantRepository,
    SurrealUserRepository,
};
pub use schema::{run_migrations, schema_v1};
