//! Invitation domain model.
//!
//! An invitation is a single-use, time-bounded bearer offer to join an
//! organization with a given role. Its status only ever moves forward:
//!
//! ```text
//! pending ──► accepted
//!    │
//!    ├──────► expired
//!    │
//!    └──────► revoked
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AgentXmapError;
use crate::models::user::UserRole;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
    Revoked,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Expired => "expired",
            InvitationStatus::Revoked => "revoked",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }

    /// Only `pending` has outgoing edges, and none of them lead back to it.
    pub fn can_transition_to(&self, next: InvitationStatus) -> bool {
        matches!(
            (self, next),
            (
                InvitationStatus::Pending,
                InvitationStatus::Accepted | InvitationStatus::Expired | InvitationStatus::Revoked
            )
        )
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvitationStatus {
    type Err = AgentXmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            "expired" => Ok(InvitationStatus::Expired),
            "revoked" => Ok(InvitationStatus::Revoked),
            other => Err(AgentXmapError::Validation {
                message: format!("unknown invitation status: {other}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Invitation {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub invitor_id: Uuid,
    pub email: String,
    /// Opaque bearer token handed to the invitee.
    pub token: String,
    pub role: UserRole,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invitation {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Fields required to create a new invitation. New invitations always
/// start out `pending`.
#[derive(Debug, Clone)]
pub struct CreateInvitation {
    pub organization_id: Uuid,
    pub invitor_id: Uuid,
    pub email: String,
    pub token: String,
    pub role: UserRole,
    pub expires_at: DateTime<Utc>,
}
