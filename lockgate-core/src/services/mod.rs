//! Service layer for business logic
//!
//! This module contains the lockout guard and the login flow built on top of it.

pub mod lockout;
pub mod login;

pub use lockout::LockoutGuard;
pub use login::LoginService;
