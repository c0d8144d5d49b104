//! Authentication module for Huddle.
//!
//! Account password hashing, room secret hashing and bearer credentials.

mod credentials;
mod password;

pub use credentials::{
    CredentialError, CredentialVerifier, JwtClaims, JwtCredentialVerifier, JwtState,
};
pub use password::{
    hash_password, hash_secret, validate_password, verify_password, PasswordError,
    MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH,
};
