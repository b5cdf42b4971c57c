//! Password hashing and session token generation.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hostel_core::{HostelError, Result};
use rand::RngCore;

/// Hash a password into an Argon2 PHC string with a fresh salt.
///
/// # Errors
///
/// Returns [`HostelError::Internal`] if hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HostelError::Internal(format!("Failed to hash password: {e}")))
}

/// Check a password against a stored PHC string.
///
/// A hash that does not parse never verifies.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

/// A 256-bit random token encoded as base64url (43 characters).
#[must_use]
pub fn generate_session_token() -> String {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random_bytes);
    URL_SAFE_NO_PAD.encode(random_bytes)
}
