//! Password hashing (Argon2, PHC string digests).

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

/// Hash a plaintext password into a PHC-format digest.
///
/// The random salt is embedded in the digest; nothing is stored separately.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!(e.to_string()))?
        .to_string();
    Ok(phc)
}

/// Verify a plaintext password against a stored digest.
///
/// Returns false on mismatch AND on a malformed digest: a corrupt stored
/// hash must deny access, not surface a decode error.
pub fn verify_password(digest: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(digest) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else {
        false
    }
}
