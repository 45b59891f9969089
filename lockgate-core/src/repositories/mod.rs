//! Repository traits for data access layer
//!
//! This module defines the storage interface the lockout guard uses, plus the
//! in-process implementation. Shared stores for multi-instance deployments live
//! in their own crates (for example `lockgate-storage-sqlite`) and implement the
//! same [`LockoutRepository`] trait.

pub mod lockout;
pub mod memory;

pub use lockout::LockoutRepository;
pub use memory::InMemoryLockoutRepository;

