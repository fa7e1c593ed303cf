//! Invitation lifecycle rules.
//!
//! Expiry is evaluated lazily, when someone tries to accept. Every status
//! change is written as a compare-and-set against the status the caller
//! read, so a racing writer cannot be silently overwritten.

use agentxmap_core::RequestContext;
use agentxmap_core::error::AgentXmapError;
use agentxmap_core::models::invitation::{CreateInvitation, Invitation, InvitationStatus};
use agentxmap_core::models::user::{User, UserRole};
use agentxmap_core::repository::InvitationRepository;
use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{AuthError, AuthResult};

/// What an accept attempt should do with a stored invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptCheck {
    /// Pending and still valid.
    Proceed,
    /// Pending but past its expiry; must be marked `expired`.
    Expire,
}

/// Decide whether `invitation` may be accepted at `now`.
///
/// Non-pending invitations are rejected before expiry is looked at, so an
/// invitation already marked `expired` never has its expiry recomputed.
pub fn check_accept(invitation: &Invitation, now: DateTime<Utc>) -> AuthResult<AcceptCheck> {
    if invitation.status != InvitationStatus::Pending {
        return Err(AuthError::InvitationNotPending {
            status: invitation.status,
        });
    }
    if invitation.is_expired_at(now) {
        return Ok(AcceptCheck::Expire);
    }
    Ok(AcceptCheck::Proceed)
}

/// A validated status edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: InvitationStatus,
    pub to: InvitationStatus,
}

impl Transition {
    pub const ACCEPT: Transition = Transition {
        from: InvitationStatus::Pending,
        to: InvitationStatus::Accepted,
    };
    pub const EXPIRE: Transition = Transition {
        from: InvitationStatus::Pending,
        to: InvitationStatus::Expired,
    };
    pub const REVOKE: Transition = Transition {
        from: InvitationStatus::Pending,
        to: InvitationStatus::Revoked,
    };

    pub fn new(from: InvitationStatus, to: InvitationStatus) -> AuthResult<Self> {
        if from.can_transition_to(to) {
            Ok(Self { from, to })
        } else {
            Err(AuthError::InvitationNotPending { status: from })
        }
    }

    /// Persist this transition for `invitation_id`.
    ///
    /// A stale `from` surfaces as [`AuthError::InvitationConflict`].
    pub async fn apply<R: InvitationRepository>(
        self,
        repo: &R,
        ctx: &RequestContext,
        invitation_id: uuid::Uuid,
    ) -> AuthResult<Invitation> {
        ctx.run(repo.transition_status(invitation_id, self.from, self.to))
            .await
            .map_err(|e| match e {
                AgentXmapError::Conflict { .. } => AuthError::InvitationConflict,
                other => AuthError::Repository(other),
            })
    }
}

/// Build a fresh `pending` invitation on behalf of `invitor`.
///
/// Fails with a validation error if `now + lifetime` is not representable.
pub fn new_invitation(
    invitor: &User,
    email: &str,
    role: UserRole,
    token: String,
    now: DateTime<Utc>,
    lifetime: TimeDelta,
) -> AuthResult<CreateInvitation> {
    let expires_at = now
        .checked_add_signed(lifetime)
        .ok_or_else(|| AuthError::validation("invitation_lifetime_secs", "out of range"))?;
    Ok(CreateInvitation {
        organization_id: invitor.organization_id,
        invitor_id: invitor.id,
        email: email.to_string(),
        token,
        role,
        expires_at,
    })
}
