//! HS256 JWT verification.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

use super::{AuthError, Identity, IdentityVerifier};
use crate::config::Config;

/// Claims read from a bearer token.
#[derive(Debug, Clone, Deserialize)]
struct IdentityClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

/// Verifies HMAC-SHA256 signed tokens against a shared secret.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Create a verifier. `exp` is always required; issuer and audience are
    /// checked only when given.
    pub fn new(secret: &[u8], issuer: Option<&str>, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            config.jwt_issuer.as_deref(),
            config.jwt_audience.as_deref(),
        )
    }

    fn decode(&self, token: &str) -> Result<Identity, AuthError> {
        let data = jsonwebtoken::decode::<IdentityClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "invalid bearer token");
                AuthError::InvalidToken(e.to_string())
            })?;

        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("empty subject".to_string()));
        }

        Ok(Identity {
            subject: claims.sub,
            email: claims.email,
            roles: claims.roles,
        })
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.decode(token)
    }
}
