use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
    routing::{get, post},
};
use lockgate::{Clock, CredentialVerifier, Lockgate, LockoutRepository};
use serde::Serialize;

use crate::{
    error::{ApiError, Result},
    types::{HealthResponse, LoginRequest},
};

/// Create the login routes.
///
/// The returned router can be nested at any path, e.g. `/auth`.
pub fn routes<R, V>(lockgate: Arc<Lockgate<R, V>>) -> Router
where
    R: LockoutRepository,
    V: CredentialVerifier,
    V::Payload: Serialize,
{
    Router::new()
        .route("/login", post(login_handler::<R, V>))
        .route("/health", get(health_handler::<R, V>))
        .with_state(lockgate)
}

async fn login_handler<R, V>(
    State(lockgate): State<Arc<Lockgate<R, V>>>,
    request: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse>
where
    R: LockoutRepository,
    V: CredentialVerifier,
    V::Payload: Serialize,
{
    let Json(request) = request.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let payload = lockgate
        .login(&request.email, &request.password)
        .await
        .map_err(|e| ApiError::from_login_error(e, lockgate.clock().now()))?;

    Ok(Json(payload))
}

async fn health_handler<R, V>(
    State(lockgate): State<Arc<Lockgate<R, V>>>,
) -> Result<impl IntoResponse>
where
    R: LockoutRepository,
    V: CredentialVerifier,
{
    lockgate.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Health check failed");
        ApiError::Internal
    })?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
