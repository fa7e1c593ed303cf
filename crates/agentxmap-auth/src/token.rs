//! Opaque invitation token generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::error::AuthError;

/// Token entropy in bytes (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Generate a cryptographically random invitation token
/// (32 bytes → base64url-encoded, no padding).
///
/// Reads straight from the operating system RNG and fails with
/// [`AuthError::Entropy`] if it is unavailable.
pub fn generate_invitation_token() -> Result<String, AuthError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::Entropy(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
