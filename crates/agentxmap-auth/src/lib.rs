//! agentxmap Auth: password hashing, invitation tokens and the identity
//! service (sign-up, login, invitations).

pub mod config;
pub mod error;
pub mod events;
pub mod invitation;
pub mod password;
pub mod service;
pub mod token;
mod validation;

pub use config::IdentityConfig;
pub use error::{AuthError, AuthResult, ErrorKind};
pub use events::{IdentityEvent, IdentityObserver, TracingObserver};
pub use password::PasswordCodec;
pub use service::{
    AcceptInvitationInput, IdentityService, InviteInput, LoginInput, SignUpInput, SignUpOutput,
};
