//! # Lockgate Axum Integration
//!
//! Axum routes for a login endpoint guarded by [`lockgate`].
//!
//! - `POST /login` takes `{"email", "password"}` and answers with the
//!   verifier's payload (200), wrong credentials (401), a lockout (403 with
//!   `Retry-After`), or a generic internal error (500)
//! - `GET /health` checks the lockout store
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use axum::Router;
//! use lockgate::LockgateBuilder;
//!
//! let lockgate = Arc::new(
//!     LockgateBuilder::new()
//!         .with_sqlite("sqlite://lockgate.db?mode=rwc")
//!         .await?
//!         .apply_migrations(true)
//!         .build(Arc::new(MyUsers))
//!         .await?,
//! );
//!
//! let app = Router::new().nest("/auth", lockgate_axum::routes(lockgate));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! ```

mod error;
mod routes;
mod types;

pub use error::{ApiError, Result};
pub use routes::routes;
pub use types::{HealthResponse, LoginRequest};
