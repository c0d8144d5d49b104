//! Password and room secret hashing for Huddle.
//!
//! Uses Argon2id. Only PHC-formatted hashes are ever stored.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use rand_core::OsRng;
use thiserror::Error;

/// Minimum account password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum account password length.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Password-related errors.
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Password is too short.
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    TooShort,

    /// Password is too long.
    #[error("password must be at most {MAX_PASSWORD_LENGTH} characters")]
    TooLong,

    /// Secret is empty.
    #[error("secret must not be empty")]
    Empty,

    /// Hashing failed.
    #[error("password hashing failed: {0}")]
    HashError(String),

    /// Stored hash is not a valid PHC string.
    #[error("invalid password hash format")]
    InvalidHash,

    /// Wrong password or secret.
    #[error("password verification failed")]
    VerificationFailed,
}

/// Argon2id with 19 MiB memory, 2 iterations, 1 lane.
fn create_argon2() -> Result<Argon2<'static>, PasswordError> {
    let params =
        Params::new(19456, 2, 1, None).map_err(|e| PasswordError::HashError(e.to_string()))?;
    Ok(Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params,
    ))
}

/// Hash an arbitrary non-empty secret, such as a room password.
pub fn hash_secret(secret: &str) -> Result<String, PasswordError> {
    if secret.is_empty() {
        return Err(PasswordError::Empty);
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = create_argon2()?
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(hash.to_string())
}

/// Hash an account password after checking the length policy.
///
/// # Examples
///
/// ```
/// use huddle::auth::hash_password;
///
/// let hash = hash_password("my_secure_password").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    validate_password(password)?;
    hash_secret(password)
}

/// Verify a password or secret against a stored hash.
///
/// The parameters come from the parsed hash, not from `create_argon2()`.
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| PasswordError::VerificationFailed)
}

/// Validate account password length.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    let len = password.chars().count();

    if len < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort);
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(PasswordError::TooLong);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(PasswordError::VerificationFailed)
        ));
    }

    #[test]
    fn test_hash_secret_allows_short_secrets() {
        let hash = hash_secret("abc").unwrap();
        assert!(verify_password("abc", &hash).is_ok());
    }

    #[test]
    fn test_hash_secret_rejects_empty() {
        assert!(matches!(hash_secret(""), Err(PasswordError::Empty)));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_secret("same").unwrap();
        let b = hash_secret("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_invalid_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(PasswordError::InvalidHash)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(PasswordError::TooShort)
        ));
        assert!(matches!(
            validate_password(&"x".repeat(MAX_PASSWORD_LENGTH + 1)),
            Err(PasswordError::TooLong)
        ));
        assert!(validate_password("12345678").is_ok());
    }
}
