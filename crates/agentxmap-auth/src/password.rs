//! Password hashing and verification using Argon2id.
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=…,t=…,p=…$salt$hash`), so
//! the cost parameters travel with each digest and verification keeps
//! working after the configured cost changes. Salts are 16 bytes drawn
//! from the operating system RNG.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::config::IdentityConfig;
use crate::error::AuthError;

const SALT_LEN: usize = 16;

/// One-way credential codec.
#[derive(Clone)]
pub struct PasswordCodec {
    params: Params,
    pepper: Option<String>,
    /// Digest verified against when there is no stored one, so a miss
    /// costs as much as a hit.
    dummy_hash: String,
}

impl std::fmt::Debug for PasswordCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordCodec")
            .field("params", &self.params)
            .field("pepper", &self.pepper.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl PasswordCodec {
    pub fn new(config: &IdentityConfig) -> Result<Self, AuthError> {
        let params = Params::new(
            config.password_memory_kib,
            config.password_iterations,
            config.password_parallelism,
            None,
        )
        .map_err(|e| AuthError::Encoding(format!("argon2 params: {e}")))?;
        let mut codec = Self {
            params,
            pepper: config.pepper.clone(),
            dummy_hash: String::new(),
        };
        codec.dummy_hash = codec.hash("agentxmap-dummy-credential")?;
        Ok(codec)
    }

    /// Hash a plaintext password with a fresh random salt.
    ///
    /// Fails with [`AuthError::Encoding`] only if the salt cannot be drawn
    /// or the hasher rejects its input.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let mut salt_bytes = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|e| AuthError::Encoding(format!("salt generation: {e}")))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AuthError::Encoding(format!("salt encoding: {e}")))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let input = peppered(password, self.pepper.as_deref());
        argon2
            .hash_password(input.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Encoding(format!("password hash: {e}")))
    }

    /// Verify a plaintext password against a stored PHC string.
    ///
    /// Any failure, including a malformed digest, is reported as a plain
    /// mismatch. The digest comparison itself is constant-time.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };
        let input = peppered(password, self.pepper.as_deref());
        Argon2::default()
            .verify_password(input.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Spend one verification's worth of work on `password` when there is
    /// no stored digest to check it against.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash);
    }
}

fn peppered(password: &str, pepper: Option<&str>) -> String {
    match pepper {
        Some(p) => format!("{p}{password}"),
        None => password.to_string(),
    }
}
