//! Bearer credentials: JWT issuance and verification.
//!
//! The chat core only sees the [`CredentialVerifier`] trait; the JWT
//! implementation here is the adapter used by the server.

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::Identity;
use crate::db::{DbPool, UserRepository};

/// JWT claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: i64,
    /// Username at issuance time.
    pub username: String,
    /// Issued at timestamp.
    pub iat: u64,
    /// Expiration timestamp.
    pub exp: u64,
    /// JWT ID.
    pub jti: String,
}

/// Why a credential was refused.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// No credential supplied.
    #[error("credential missing")]
    Missing,

    /// Malformed, expired or wrongly signed token.
    #[error("invalid or expired credential")]
    Invalid,

    /// The token refers to a user that no longer exists.
    #[error("unknown user")]
    UnknownUser,

    /// The user account is disabled.
    #[error("account disabled")]
    Disabled,

    /// The user store could not be reached.
    #[error("credential backend error: {0}")]
    Backend(String),
}

/// Key material for signing and checking tokens.
#[derive(Clone)]
pub struct JwtState {
    /// Encoding key for issuing tokens.
    pub encoding_key: EncodingKey,
    /// Decoding key for verification.
    pub decoding_key: DecodingKey,
    /// Validation settings.
    pub validation: Validation,
    /// Access token lifetime in seconds.
    pub expiry_secs: u64,
}

impl JwtState {
    /// Create JWT state from a shared secret.
    pub fn new(secret: &str, expiry_secs: u64) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiry_secs,
        }
    }

    /// Issue an access token for a user.
    pub fn issue(&self, user_id: i64, username: &str) -> Result<String, CredentialError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user_id,
            username: username.to_string(),
            iat: now,
            exp: now + self.expiry_secs,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            CredentialError::Backend(e.to_string())
        })
    }

    /// Decode and validate a token.
    pub fn decode(&self, token: &str) -> Result<JwtClaims, CredentialError> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT validation failed: {}", e);
                CredentialError::Invalid
            })
    }
}

/// Validates a bearer credential and yields a stable identity.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Verify `credential` and return the identity it belongs to.
    async fn verify(&self, credential: &str) -> Result<Identity, CredentialError>;
}

/// Verifies JWT access tokens against the user table.
pub struct JwtCredentialVerifier {
    jwt: JwtState,
    pool: DbPool,
}

impl JwtCredentialVerifier {
    /// Create a verifier.
    pub fn new(jwt: JwtState, pool: DbPool) -> Self {
        Self { jwt, pool }
    }
}

#[async_trait]
impl CredentialVerifier for JwtCredentialVerifier {
    async fn verify(&self, credential: &str) -> Result<Identity, CredentialError> {
        let token = credential.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token);
        if token.is_empty() {
            return Err(CredentialError::Missing);
        }

        let claims = self.jwt.decode(token)?;

        let user = UserRepository::new(&self.pool)
            .get_by_id(claims.sub)
            .await
            .map_err(|e| CredentialError::Backend(e.to_string()))?
            .ok_or(CredentialError::UnknownUser)?;

        if !user.is_active {
            return Err(CredentialError::Disabled);
        }

        Ok(Identity::new(user.id, user.username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewUser;
    use crate::Database;

    fn expired_token(secret: &str, user_id: i64) -> String {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user_id,
            username: "ghost".to_string(),
            iat: now - 7200,
            exp: now - 3600,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_and_decode() {
        let jwt = JwtState::new("test-secret", 3600);
        let token = jwt.issue(7, "alice").unwrap();
        let claims = jwt.decode(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_decode_wrong_secret() {
        let token = JwtState::new("secret1", 3600).issue(1, "alice").unwrap();
        assert!(matches!(
            JwtState::new("secret2", 3600).decode(&token),
            Err(CredentialError::Invalid)
        ));
    }

    #[test]
    fn test_decode_expired() {
        let jwt = JwtState::new("secret", 3600);
        assert!(jwt.decode(&expired_token("secret", 1)).is_err());
    }

    #[tokio::test]
    async fn test_verifier_yields_identity() {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("alice", "hash"))
            .await
            .unwrap();

        let jwt = JwtState::new("secret", 3600);
        let token = jwt.issue(user.id, "alice").unwrap();
        let verifier = JwtCredentialVerifier::new(jwt, db.pool().clone());

        let identity = verifier.verify(&token).await.unwrap();
        assert_eq!(identity.id, user.id);
        assert_eq!(identity.display_name, "alice");

        let identity = verifier.verify(&format!("Bearer {token}")).await.unwrap();
        assert_eq!(identity.id, user.id);
    }

    #[tokio::test]
    async fn test_verifier_rejects_unknown_and_disabled() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());
        let user = repo.create(&NewUser::new("bob", "hash")).await.unwrap();

        let jwt = JwtState::new("secret", 3600);
        let verifier = JwtCredentialVerifier::new(jwt.clone(), db.pool().clone());

        let unknown = jwt.issue(999, "nobody").unwrap();
        assert!(matches!(
            verifier.verify(&unknown).await,
            Err(CredentialError::UnknownUser)
        ));

        repo.set_active(user.id, false).await.unwrap();
        let token = jwt.issue(user.id, "bob").unwrap();
        assert!(matches!(
            verifier.verify(&token).await,
            Err(CredentialError::Disabled)
        ));

        assert!(matches!(
            verifier.verify("   ").await,
            Err(CredentialError::Missing)
        ));
    }
}
