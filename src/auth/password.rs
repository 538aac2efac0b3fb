use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Prefix of every PHC string produced by [`hash_password`].
pub const HASH_PREFIX: &str = "$argon2";

/// Outcome of checking a password against what is stored for the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    Valid,
    /// Matched a plaintext password that must be re-hashed.
    ValidLegacy,
    Invalid,
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

pub fn is_hashed(stored: &str) -> bool {
    stored.starts_with(HASH_PREFIX)
}

pub fn check_stored(plain: &str, stored: &str) -> anyhow::Result<PasswordCheck> {
    if is_hashed(stored) {
        return Ok(if verify_password(plain, stored)? {
            PasswordCheck::Valid
        } else {
            PasswordCheck::Invalid
        });
    }
    if !stored.is_empty() && plain == stored {
        Ok(PasswordCheck::ValidLegacy)
    } else {
        Ok(PasswordCheck::Invalid)
    }
}
