//! Application error types.

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// PostgreSQL SQLSTATE raised when `statement_timeout` cancels a query.
const QUERY_CANCELED: &str = "57014";

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found")]
    NotFound,

    #[error("query timed out")]
    Timeout,

    #[error("database unavailable")]
    Unavailable(#[source] sqlx::Error),

    #[error("failed to decode row: {0}")]
    Decode(String),

    #[error("database error")]
    Database(#[source] sqlx::Error),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a [`AppError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    /// Whether the caller may safely retry the same request.
    ///
    /// Only transient backing-store failures qualify. Reads are idempotent,
    /// so a retry never duplicates side effects.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Timeout | AppError::Unavailable(_))
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Timeout | AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Decode(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => AppError::Unavailable(err),
            sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some(QUERY_CANCELED) => {
                AppError::Timeout
            }
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => AppError::Decode(err.to_string()),
            _ => AppError::Database(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Client errors carry their message; server errors stay vague.
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                "internal server error".to_string()
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "internal server error".to_string()
            }
            AppError::Unavailable(e) => {
                tracing::error!(error = %e, "database unavailable");
                "service temporarily unavailable".to_string()
            }
            AppError::Decode(detail) => {
                tracing::error!(detail = %detail, "row decode failure");
                "internal server error".to_string()
            }
            AppError::Timeout => {
                tracing::warn!("query exceeded statement timeout");
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({ "error": message }));

        if matches!(self, AppError::Unauthorized(_)) {
            (
                status,
                [(header::WWW_AUTHENTICATE, "Bearer error=\"invalid_token\"")],
                body,
            )
                .into_response()
        } else if self.is_retryable() {
            (status, [(header::RETRY_AFTER, "1")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_retryable() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, AppError::Unavailable(_)));
        assert!(err.is_retryable());
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn column_not_found_is_decode() {
        let err = AppError::from(sqlx::Error::ColumnNotFound("risk_factors".to_string()));
        assert!(matches!(err, AppError::Decode(_)));
        assert!(!err.is_retryable());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn row_not_found_is_database() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::Database(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(
            AppError::validation("page must be at least 1").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("missing token".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden("role".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn retryable_response_sets_retry_after() {
        let response = AppError::Timeout.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "1");
    }

    #[test]
    fn unauthorized_response_sets_challenge() {
        let response = AppError::Unauthorized("missing bearer token".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_some());
    }
}
