//! SurrealDB repository implementations.

mod invitation;
mod organization;
mod tenant;
mod user;

pub use invitation::SurrealInvitationRepository;
pub use organization::SurrealOrganizationRepository;
pub use tenant::SurrealTenantRepository;
pub use user::SurrealUserRepository;

use uuid::Uuid;

use crate::error::DbError;

pub(crate) fn parse_uuid(entity: &str, field: &str, raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::decode(entity, format!("invalid {field}: {e}")))
}
