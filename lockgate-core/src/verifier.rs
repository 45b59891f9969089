//! The credential verifier contract.
//!
//! Credential checks are owned by the application (password hashes, user
//! tables, external identity providers). The login flow only needs a verdict.

use async_trait::async_trait;

use crate::error::VerifierError;

/// Verdict of a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification<P> {
    /// The secret matched; carries whatever the application returns on login.
    Matched(P),

    /// Unknown principal or wrong secret.
    Mismatched,
}

impl<P> Verification<P> {
    pub fn is_match(&self) -> bool {
        matches!(self, Verification::Matched(_))
    }
}

/// Checks a principal's secret against stored credentials.
///
/// Implementations must return `Ok(Verification::Mismatched)` for a wrong
/// secret and reserve `Err` for infrastructure failures such as an unreachable
/// credential store. Only mismatches count towards a lockout.
#[async_trait]
pub trait CredentialVerifier: Send + Sync + 'static {
    /// Returned to the caller on a successful login.
    type Payload: Send + 'static;

    async fn verify(
        &self,
        principal: &str,
        secret: &str,
    ) -> Result<Verification<Self::Payload>, VerifierError>;
}
