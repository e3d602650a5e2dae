//! Password hashing for the local identity provider.
//!
//! Argon2id with a per-account random salt. Only the salt and the derived
//! hash are stored.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

/// Memory cost in KiB.
pub const M_COST: u32 = 19456;
pub const T_COST: u32 = 2;
pub const P_COST: u32 = 1;
pub const OUTPUT_LEN: usize = 32;
pub const SALT_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(String);

/// Generate a random salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Derive the stored hash for `password` under `salt`.
pub fn hash(password: &str, salt: &[u8]) -> Result<[u8; OUTPUT_LEN], PasswordError> {
    let params = Params::new(M_COST, T_COST, P_COST, Some(OUTPUT_LEN))
        .map_err(|e| PasswordError(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = [0u8; OUTPUT_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut output)
        .map_err(|e| PasswordError(e.to_string()))?;
    Ok(output)
}

/// Check `password` against a stored salt and hash.
pub fn verify(password: &str, salt: &[u8], expected: &[u8]) -> Result<bool, PasswordError> {
    let derived = hash(password, salt)?;
    if derived.len() != expected.len() {
        return Ok(false);
    }
    // Compare every byte regardless of where the first mismatch is.
    let diff = derived
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    Ok(diff == 0)
}
