//! Core functionality for the lockgate project
//!
//! This crate contains the login lockout guard and the login flow that wraps a
//! credential check with it.
//!
//! See [`LockoutGuard`] for the per-principal lockout state machine,
//! [`LoginService`] for the check, verify, record sequence, and
//! [`LockoutRepository`] for plugging in a backing store.
//!
//! Stores shared between service instances live in separate crates and
//! implement the same [`LockoutRepository`] trait as the in-memory store.
//!
pub mod clock;
pub mod error;
pub mod repositories;
pub mod services;
pub mod storage;
pub mod verifier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AuthError, Error, StorageError, VerifierError};
pub use repositories::{InMemoryLockoutRepository, LockoutRepository};
pub use services::{LockoutGuard, LoginService};
pub use storage::{
    AttemptDecision, DEFAULT_LOCKOUT_THRESHOLD, DEFAULT_LOCKOUT_WINDOW, LockoutConfig,
    LockoutRecord, LockoutStatus, MAX_LOCKOUT_PERIOD,
};
pub use verifier::{CredentialVerifier, Verification};
