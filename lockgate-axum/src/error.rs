use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use lockgate::{AuthError, Error};
use serde_json::json;
use thiserror::Error;

/// Errors returned by the login routes.
///
/// Only the lockout and wrong-credential cases carry detail to the client.
/// Everything else becomes a generic 500 and is logged instead.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Too many failed login attempts")]
    LockedOut { retry_after_secs: u64 },

    #[error("Wrong email or password")]
    InvalidCredentials,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Map a login error, computing `Retry-After` against `now`.
    pub fn from_login_error(err: Error, now: DateTime<Utc>) -> Self {
        match err {
            Error::Auth(AuthError::LockedOut { locked_until }) => ApiError::LockedOut {
                retry_after_secs: retry_after_secs(locked_until, now),
            },
            Error::Auth(AuthError::InvalidCredentials) => ApiError::InvalidCredentials,
            Error::Verifier(e) => {
                tracing::error!(error = %e, "Login failed on credential verification");
                ApiError::Internal
            }
            Error::Storage(e) => {
                tracing::error!(error = %e, "Login failed on lockout storage");
                ApiError::Internal
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::LockedOut { .. } => StatusCode::FORBIDDEN,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Whole seconds until `locked_until`, rounded up so clients never retry early.
fn retry_after_secs(locked_until: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (locked_until - now).num_milliseconds().max(0);
    u64::try_from(millis).unwrap_or_default().div_ceil(1000)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "code": status.as_u16()
        }));

        let mut response = (status, body).into_response();
        if let ApiError::LockedOut { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
