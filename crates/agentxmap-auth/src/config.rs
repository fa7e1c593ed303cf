//! Identity service configuration.

use chrono::TimeDelta;

use crate::error::{AuthError, AuthResult};

/// Longest accepted invitation lifetime (one year).
pub const MAX_INVITATION_LIFETIME_SECS: u64 = 365 * 24 * 60 * 60;

/// Configuration for the identity service.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Optional pepper prepended to passwords before Argon2id hashing
    /// and verification.
    pub pepper: Option<String>,
    /// Argon2id memory cost in KiB (default: 19_456 = 19 MiB).
    pub password_memory_kib: u32,
    /// Argon2id iteration count (default: 2).
    pub password_iterations: u32,
    /// Argon2id lanes (default: 1).
    pub password_parallelism: u32,
    /// Invitation lifetime in seconds (default: 172_800 = 48 hours).
    pub invitation_lifetime_secs: u64,
    /// How many tokens to try before giving up on a uniqueness
    /// collision (default: 2 = one retry).
    pub invitation_token_attempts: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            pepper: None,
            password_memory_kib: 19_456,
            password_iterations: 2,
            password_parallelism: 1,
            invitation_lifetime_secs: 172_800,
            invitation_token_attempts: 2,
        }
    }
}

impl IdentityConfig {
    /// The invitation lifetime as a duration, checked to lie within
    /// `1..=MAX_INVITATION_LIFETIME_SECS`.
    pub fn invitation_lifetime(&self) -> AuthResult<TimeDelta> {
        let secs = self.invitation_lifetime_secs;
        if secs == 0 || secs > MAX_INVITATION_LIFETIME_SECS {
            return Err(AuthError::validation(
                "invitation_lifetime_secs",
                format!("must be between 1 and {MAX_INVITATION_LIFETIME_SECS}"),
            ));
        }
        i64::try_from(secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| AuthError::validation("invitation_lifetime_secs", "out of range"))
    }
}
