//! Start-up provisioning of the configured initial admin.

use agentxmap_auth::{AuthError, IdentityObserver, IdentityService, SignUpInput};
use agentxmap_core::RequestContext;
use agentxmap_core::repository::{InvitationRepository, TenantRepository, UserRepository};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::InitialAdmin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Created { organization_id: Uuid, admin_id: Uuid },
    AlreadyExists,
    Failed,
}

/// Sign up the initial admin and its organization.
///
/// Never fails start-up: an existing account is the normal case on every
/// restart, and other errors are logged for the operator.
pub async fn ensure_initial_admin<U, I, T, O>(
    service: &IdentityService<U, I, T, O>,
    ctx: &RequestContext,
    admin: &InitialAdmin,
) -> BootstrapOutcome
where
    U: UserRepository,
    I: InvitationRepository,
    T: TenantRepository,
    O: IdentityObserver,
{
    let input = SignUpInput {
        organization_name: admin.organization.clone(),
        email: admin.email.clone(),
        password: admin.password.clone(),
    };

    match service.sign_up(ctx, input).await {
        Ok(out) => {
            info!(
                organization_id = %out.organization.id,
                admin_id = %out.user.id,
                email = %out.user.email,
                "Initial admin created"
            );
            BootstrapOutcome::Created {
                organization_id: out.organization.id,
                admin_id: out.user.id,
            }
        }
        Err(AuthError::UserAlreadyExists | AuthError::OrganizationAlreadyExists) => {
            info!(email = %admin.email, "Initial admin already exists");
            BootstrapOutcome::AlreadyExists
        }
        Err(e) => {
            error!(email = %admin.email, error = %e, "Failed to create initial admin");
            BootstrapOutcome::Failed
        }
    }
}
