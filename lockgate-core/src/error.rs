use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Credential verifier error: {0}")]
    Verifier(#[from] VerifierError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// The credential verifier rejected the secret. The message is generic on
    /// purpose so callers cannot tell an unknown principal from a wrong secret.
    #[error("Wrong email or password")]
    InvalidCredentials,

    #[error("Too many failed login attempts")]
    LockedOut { locked_until: DateTime<Utc> },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

/// Infrastructure failure reported by a [`CredentialVerifier`](crate::CredentialVerifier).
///
/// A wrong secret is never an error; it is reported as
/// [`Verification::Mismatched`](crate::Verification::Mismatched).
#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("Credential store unavailable: {0}")]
    Unavailable(String),

    #[error("Internal verifier error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error is a login rejection rather than an internal failure.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Error::Auth(AuthError::InvalidCredentials) | Error::Auth(AuthError::LockedOut { .. })
        )
    }

    /// Whether the principal is locked out.
    pub fn is_locked_out(&self) -> bool {
        matches!(self, Error::Auth(AuthError::LockedOut { .. }))
    }

    /// The instant a locked-out principal may try again, if this is a lockout.
    pub fn locked_until(&self) -> Option<DateTime<Utc>> {
        match self {
            Error::Auth(AuthError::LockedOut { locked_until }) => Some(*locked_until),
            _ => None,
        }
    }
}
