//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Lookups report a missing record
//! as [`AgentXmapError::NotFound`](crate::error::AgentXmapError::NotFound)
//! so callers can tell it apart from a transport failure.

use uuid::Uuid;

use crate::error::AgentXmapResult;
use crate::models::{
    invitation::{CreateInvitation, Invitation, InvitationStatus},
    organization::{CreateOrganization, Organization},
    tenant::{CreateTenant, Tenant},
    user::{CreateUser, UpdateUser, User},
};

// ---------------------------------------------------------------------------
// Organization & tenant bootstrap
// ---------------------------------------------------------------------------

pub trait OrganizationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOrganization,
    ) -> impl Future<Output = AgentXmapResult<Organization>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = AgentXmapResult<Organization>> + Send;
    fn get_by_slug(&self, slug: &str)
    -> impl Future<Output = AgentXmapResult<Organization>> + Send;
}

/// Writes an organization and its first admin as one unit.
pub trait TenantRepository: Send + Sync {
    /// Either both records are committed or neither is.
    fn create_tenant(&self, input: CreateTenant)
    -> impl Future<Output = AgentXmapResult<Tenant>> + Send;
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = AgentXmapResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = AgentXmapResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = AgentXmapResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = AgentXmapResult<User>> + Send;
    /// Soft-delete: sets `deleted_at`.
    fn delete(&self, id: Uuid) -> impl Future<Output = AgentXmapResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Invitations
// ---------------------------------------------------------------------------

pub trait InvitationRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the token collides with a stored one.
    fn create(
        &self,
        input: CreateInvitation,
    ) -> impl Future<Output = AgentXmapResult<Invitation>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = AgentXmapResult<Invitation>> + Send;
    fn get_by_token(&self, token: &str)
    -> impl Future<Output = AgentXmapResult<Invitation>> + Send;

    /// Compare-and-set on the status column.
    ///
    /// Moves the invitation from `from` to `to` only if its stored status
    /// is still `from`. Returns `Conflict` when the stored status differs
    /// and `NotFound` when the invitation does not exist.
    fn transition_status(
        &self,
        id: Uuid,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> impl Future<Output = AgentXmapResult<Invitation>> + Send;
}
