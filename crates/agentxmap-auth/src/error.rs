//! Identity error types.

use agentxmap_core::error::AgentXmapError;
use agentxmap_core::models::invitation::InvitationStatus;
use thiserror::Error;

/// Coarse classification of an [`AuthError`], for boundary layers that
/// map errors onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Authentication,
    Authorization,
    StateConflict,
    Dependency,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("organization already exists")]
    OrganizationAlreadyExists,

    #[error("could not allocate a unique invitation token")]
    TokenCollision,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("insufficient permissions")]
    InsufficientPermissions,

    #[error("invitor not found")]
    InvitorNotFound,

    #[error("invalid invitation token")]
    InvalidInvitationToken,

    /// The message stays generic; `status` is for the caller, not the
    /// response body.
    #[error("invitation is not pending")]
    InvitationNotPending { status: InvitationStatus },

    #[error("invitation expired")]
    InvitationExpired,

    #[error("invitation was modified concurrently")]
    InvitationConflict,

    #[error("password encoding error: {0}")]
    Encoding(String),

    #[error("entropy source error: {0}")]
    Entropy(String),

    #[error(transparent)]
    Repository(#[from] AgentXmapError),
}

impl AuthError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AuthError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation { .. } => ErrorKind::Validation,
            AuthError::UserAlreadyExists
            | AuthError::OrganizationAlreadyExists
            | AuthError::TokenCollision => ErrorKind::Conflict,
            AuthError::InvalidCredentials => ErrorKind::Authentication,
            AuthError::InsufficientPermissions | AuthError::InvitorNotFound => {
                ErrorKind::Authorization
            }
            AuthError::InvalidInvitationToken
            | AuthError::InvitationNotPending { .. }
            | AuthError::InvitationExpired
            | AuthError::InvitationConflict => ErrorKind::StateConflict,
            AuthError::Encoding(_) | AuthError::Entropy(_) => ErrorKind::Dependency,
            AuthError::Repository(inner) => match inner {
                AgentXmapError::Validation { .. } => ErrorKind::Validation,
                AgentXmapError::AlreadyExists { .. } => ErrorKind::Conflict,
                AgentXmapError::Conflict { .. } => ErrorKind::StateConflict,
                _ => ErrorKind::Dependency,
            },
        }
    }
}

impl From<AuthError> for AgentXmapError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation { field, message } => AgentXmapError::Validation {
                message: format!("{field}: {message}"),
            },
            AuthError::UserAlreadyExists => AgentXmapError::AlreadyExists {
                entity: "user".into(),
            },
            AuthError::OrganizationAlreadyExists => AgentXmapError::AlreadyExists {
                entity: "organization".into(),
            },
            AuthError::TokenCollision => AgentXmapError::AlreadyExists {
                entity: "invitation".into(),
            },
            AuthError::InvalidCredentials => AgentXmapError::AuthenticationFailed {
                reason: err.to_string(),
            },
            AuthError::InsufficientPermissions | AuthError::InvitorNotFound => {
                AgentXmapError::AuthorizationDenied {
                    reason: err.to_string(),
                }
            }
            AuthError::InvalidInvitationToken
            | AuthError::InvitationNotPending { .. }
            | AuthError::InvitationExpired
            | AuthError::InvitationConflict => AgentXmapError::Conflict {
                entity: "invitation".into(),
                reason: err.to_string(),
            },
            AuthError::Encoding(msg) | AuthError::Entropy(msg) => AgentXmapError::Crypto(msg),
            AuthError::Repository(inner) => inner,
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
