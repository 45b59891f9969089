use std::sync::Arc;

use crate::{
    Clock, Error,
    error::AuthError,
    repositories::LockoutRepository,
    services::LockoutGuard,
    storage::AttemptDecision,
    verifier::{CredentialVerifier, Verification},
};

/// Service for the guarded login flow
///
/// Runs every attempt through check, verify, record. The verifier is only
/// called for attempts the guard lets through, and it runs without any guard
/// lock held.
pub struct LoginService<R: LockoutRepository, V: CredentialVerifier> {
    guard: Arc<LockoutGuard<R>>,
    verifier: Arc<V>,
    clock: Arc<dyn Clock>,
}

impl<R: LockoutRepository, V: CredentialVerifier> LoginService<R, V> {
    /// Create a new LoginService around a shared guard
    pub fn new(guard: Arc<LockoutGuard<R>>, verifier: Arc<V>, clock: Arc<dyn Clock>) -> Self {
        Self {
            guard,
            verifier,
            clock,
        }
    }

    pub fn guard(&self) -> &Arc<LockoutGuard<R>> {
        &self.guard
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Log a principal in
    ///
    /// # Errors
    ///
    /// - [`AuthError::LockedOut`] if the principal was already locked (the
    ///   verifier is not called) or this failure reached the threshold
    /// - [`AuthError::InvalidCredentials`] for any other mismatch
    /// - [`Error::Verifier`] if the verifier failed; nothing is recorded
    /// - [`Error::Storage`] if the lockout store failed
    pub async fn login(&self, principal: &str, secret: &str) -> Result<V::Payload, Error> {
        let decision = self
            .guard
            .check_attempt(principal, self.clock.now())
            .await?;

        if let AttemptDecision::Locked { locked_until } = decision {
            return Err(AuthError::LockedOut { locked_until }.into());
        }

        let verification = match self.verifier.verify(principal, secret).await {
            Ok(verification) => verification,
            Err(e) => {
                tracing::error!(
                    principal = %principal,
                    error = %e,
                    "Credential verification failed"
                );
                return Err(e.into());
            }
        };

        // Verification may take a while, so stamp the outcome with a fresh reading
        let now = self.clock.now();

        match verification {
            Verification::Matched(payload) => {
                self.guard.record_outcome(principal, now, true).await?;
                Ok(payload)
            }
            Verification::Mismatched => {
                let status = self.guard.record_outcome(principal, now, false).await?;
                match status.locked_until {
                    Some(locked_until) if status.is_locked => {
                        Err(AuthError::LockedOut { locked_until }.into())
                    }
                    _ => Err(AuthError::InvalidCredentials.into()),
                }
            }
        }
    }
}
