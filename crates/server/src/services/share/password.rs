//! Share password hashing.
//!
//! Passwords are hashed with Argon2id (default parameters) into PHC strings
//! carrying their own salt. Only the hash is ever stored.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::models::SharePasswordHash;
use crate::services::CrmError;

/// Minimum share password length, in characters.
const MIN_PASSWORD_LENGTH: usize = 4;

/// Maximum share password length, in characters.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Check a share password before hashing it.
///
/// # Errors
///
/// Returns `CrmError::InvalidInput` if the password is too short or too long.
pub fn validate_password(password: &str) -> Result<(), CrmError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(CrmError::InvalidInput(format!(
            "share password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(CrmError::InvalidInput(format!(
            "share password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `CrmError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<SharePasswordHash, CrmError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| SharePasswordHash::from_phc(hash.to_string()))
        .map_err(|_| CrmError::PasswordHash)
}

/// Verify a password against a stored hash.
///
/// A hash that cannot be parsed never matches.
#[must_use]
pub fn verify_password(password: &str, hash: &SharePasswordHash) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash.as_phc()) else {
        tracing::error!("Stored share password hash is not a valid PHC string");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
