//! Diagnostic events emitted by the identity service.
//!
//! The service reports through an injected [`IdentityObserver`] instead
//! of a process-wide logger. Events never carry passwords, digests or
//! invitation tokens.

use std::sync::Arc;

use agentxmap_core::models::invitation::InvitationStatus;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    TenantCreated {
        organization_id: Uuid,
        admin_id: Uuid,
    },
    LoginSucceeded {
        user_id: Uuid,
    },
    /// `lookup_error` is set when the user lookup failed for a reason
    /// other than the account not existing.
    LoginFailed {
        lookup_error: Option<String>,
    },
    InvitationCreated {
        invitation_id: Uuid,
        organization_id: Uuid,
    },
    /// An invite target already has an account.
    InvitationSkipped {
        organization_id: Uuid,
        email: String,
    },
    InvitationTokenCollision {
        attempt: u32,
    },
    InvitationExpired {
        invitation_id: Uuid,
    },
    InvitationAccepted {
        invitation_id: Uuid,
        user_id: Uuid,
    },
    /// The user was created but the invitation could not be marked
    /// `accepted`.
    InvitationMarkFailed {
        invitation_id: Uuid,
        user_id: Uuid,
        error: String,
    },
    /// The invitation was closed while the user was being created, so
    /// the user was soft-deleted again. `error` is set if that failed.
    InvitationAcceptRolledBack {
        invitation_id: Uuid,
        user_id: Uuid,
        status: InvitationStatus,
        error: Option<String>,
    },
    InvitationRevoked {
        invitation_id: Uuid,
        actor_id: Uuid,
    },
}

pub trait IdentityObserver: Send + Sync {
    fn record(&self, event: &IdentityEvent);
}

impl<T: IdentityObserver + ?Sized> IdentityObserver for Arc<T> {
    fn record(&self, event: &IdentityEvent) {
        (**self).record(event);
    }
}

/// Forwards identity events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl IdentityObserver for TracingObserver {
    fn record(&self, event: &IdentityEvent) {
        match event {
            IdentityEvent::TenantCreated {
                organization_id,
                admin_id,
            } => info!(%organization_id, %admin_id, "Tenant created"),
            IdentityEvent::LoginSucceeded { user_id } => info!(%user_id, "Login succeeded"),
            IdentityEvent::LoginFailed { lookup_error } => match lookup_error {
                Some(error) => warn!(error = %error, "Login failed: user lookup error"),
                None => info!("Login failed"),
            },
            IdentityEvent::InvitationCreated {
                invitation_id,
                organization_id,
            } => info!(%invitation_id, %organization_id, "Invitation created"),
            IdentityEvent::InvitationSkipped {
                organization_id,
                email,
            } => info!(%organization_id, %email, "Invitation skipped for existing user"),
            IdentityEvent::InvitationTokenCollision { attempt } => {
                warn!(attempt, "Invitation token collided, regenerating")
            }
            IdentityEvent::InvitationExpired { invitation_id } => {
                info!(%invitation_id, "Invitation expired")
            }
            IdentityEvent::InvitationAccepted {
                invitation_id,
                user_id,
            } => info!(%invitation_id, %user_id, "Invitation accepted"),
            IdentityEvent::InvitationMarkFailed {
                invitation_id,
                user_id,
                error,
            } => warn!(
                %invitation_id,
                %user_id,
                error = %error,
                "User created but invitation could not be marked accepted"
            ),
            IdentityEvent::InvitationAcceptRolledBack {
                invitation_id,
                user_id,
                status,
                error,
            } => match error {
                Some(error) => warn!(
                    %invitation_id,
                    %user_id,
                    %status,
                    error = %error,
                    "Invitation closed during accept; user could not be removed"
                ),
                None => info!(
                    %invitation_id,
                    %user_id,
                    %status,
                    "Invitation closed during accept; user removed"
                ),
            },
            IdentityEvent::InvitationRevoked {
                invitation_id,
                actor_id,
            } => info!(%invitation_id, %actor_id, "Invitation revoked"),
        }
    }
}
