//! Bearer token authorization middleware.
//!
//! Reads `Authorization: Bearer <token>`, verifies it, requires the
//! configured role, and stores the resulting [`AuthorizedContext`] in
//! request extensions. Anything else is rejected before the handler runs.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::auth::{AuthError, AuthorizedContext, authorize};
use crate::error::AppError;
use crate::state::AppState;

/// Middleware requiring a valid bearer token that carries the required role.
///
/// Missing or invalid tokens yield 401; a valid token without the role yields 403.
pub async fn require_role(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token);

    let Some(token) = token else {
        return AppError::from(AuthError::MissingToken).into_response();
    };

    let identity = match state.verifier().verify(token).await {
        Ok(identity) => identity,
        Err(e) => return AppError::from(e).into_response(),
    };

    let ctx: AuthorizedContext = match authorize(identity, state.required_role()) {
        Ok(ctx) => ctx,
        Err(e) => {
            debug!(role = %state.required_role(), "caller lacks required role");
            return AppError::from(e).into_response();
        }
    };

    request.extensions_mut().insert(ctx);
    next.run(request).await
}

/// Token from an `Authorization` header value; the scheme is case-insensitive.
fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Bearer"), None);
    }
}
