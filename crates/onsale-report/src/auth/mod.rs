//! Caller identity and role authorization.
//!
//! Token verification is pluggable through [`IdentityVerifier`]; the
//! middleware turns a verified [`Identity`] holding the required role into
//! an [`AuthorizedContext`] that report operations receive.

pub mod jwt;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::AppError;

pub use jwt::JwtVerifier;

/// Authentication and authorization failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("role '{0}' required")]
    MissingRole(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken(_) => {
                AppError::Unauthorized(err.to_string())
            }
            AuthError::MissingRole(_) => AppError::Forbidden(err.to_string()),
        }
    }
}

/// Identity asserted by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub email: Option<String>,
    pub roles: Vec<String>,
}

impl Identity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// A verified identity known to hold the required role.
///
/// Only produced by [`authorize`]; handlers and the report service trust it
/// without re-checking credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedContext {
    pub subject: String,
    pub email: Option<String>,
    pub roles: Vec<String>,
}

/// Verifies a bearer token and returns the identity it asserts.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Require `role` on a verified identity.
pub fn authorize(identity: Identity, role: &str) -> Result<AuthorizedContext, AuthError> {
    if !identity.has_role(role) {
        return Err(AuthError::MissingRole(role.to_string()));
    }
    Ok(AuthorizedContext {
        subject: identity.subject,
        email: identity.email,
        roles: identity.roles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn identity(roles: &[&str]) -> Identity {
        Identity {
            subject: "user-1".to_string(),
            email: Some("analyst@example.com".to_string()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn role_present_authorizes() {
        let ctx = authorize(identity(&["public", "user"]), "user").unwrap();
        assert_eq!(ctx.subject, "user-1");
        assert_eq!(ctx.email.as_deref(), Some("analyst@example.com"));
    }

    #[test]
    fn role_missing_is_forbidden() {
        let err = authorize(identity(&["public"]), "user").unwrap_err();
        assert!(matches!(err, AuthError::MissingRole(_)));
        assert_eq!(AppError::from(err).status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn token_errors_are_unauthorized() {
        assert_eq!(
            AppError::from(AuthError::MissingToken).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(AuthError::InvalidToken("expired".into())).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
