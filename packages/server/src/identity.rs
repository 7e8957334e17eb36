//! Credential verification against the external identity provider.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey};
use thiserror::Error;
use tracing::debug;

use crate::config::AuthConfig;
use crate::utils::jwt;

/// Subject resolved from a verified credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject_id: String,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid or expired credential")]
    InvalidCredential,

    #[error("Identity verifier misconfigured: {0}")]
    Misconfigured(String),
}

/// Turns an opaque credential into a stable subject id.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError>;
}

/// Verifies JWT identity tokens, HS256 with a shared secret or RS256 with
/// the provider's public key.
pub struct JwtIdentityVerifier {
    key: DecodingKey,
    algorithm: Algorithm,
    issuer: Option<String>,
    audience: Option<String>,
}

impl JwtIdentityVerifier {
    pub fn hs256(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm: Algorithm::HS256,
            issuer: None,
            audience: None,
        }
    }

    pub fn rs256(public_key_pem: &str) -> Result<Self, IdentityError> {
        let key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| IdentityError::Misconfigured(format!("RSA public key: {e}")))?;
        Ok(Self {
            key,
            algorithm: Algorithm::RS256,
            issuer: None,
            audience: None,
        })
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Build from configuration: RS256 when a public key is set, HS256 otherwise.
    pub fn from_config(config: &AuthConfig) -> Result<Self, IdentityError> {
        let mut verifier = match &config.public_key_pem {
            Some(pem) => Self::rs256(pem)?,
            None => Self::hs256(&config.jwt_secret),
        };
        if let Some(issuer) = &config.issuer {
            verifier = verifier.with_issuer(issuer);
        }
        if let Some(audience) = &config.audience {
            verifier = verifier.with_audience(audience);
        }
        Ok(verifier)
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError> {
        let claims = jwt::verify(
            credential,
            &self.key,
            self.algorithm,
            self.issuer.as_deref(),
            self.audience.as_deref(),
        )
        .map_err(|e| {
            debug!(error = %e, "Credential rejected");
            IdentityError::InvalidCredential
        })?;

        Ok(VerifiedIdentity {
            subject_id: claims.sub,
            email: claims.email,
        })
    }
}
