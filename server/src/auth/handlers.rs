//! Authentication endpoints.
//!
//! - POST /api/auth/register - Create a student account
//! - POST /api/auth/login - Student (or admin) login
//! - POST /api/auth/admin-login - Admin-only login
//! - POST /api/auth/logout - End the current session

use super::AuthService;
use super::middleware::BearerToken;
use crate::error::AppError;
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use hostel_core::account::{Account, Credentials, Session};
use hostel_core::types::{AccountId, Role};
use serde::Serialize;
use std::sync::Arc;

/// Response after registering.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    /// Success message
    pub message: String,
    /// New account ID
    pub account_id: AccountId,
    /// Normalized email
    pub email: String,
}

/// Response after logging in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token for subsequent requests
    pub token: String,
    /// When the token stops working
    pub expires_at: DateTime<Utc>,
    /// Logged-in account
    pub account_id: AccountId,
    /// Email
    pub email: String,
    /// Role
    pub role: Role,
}

impl LoginResponse {
    fn new(session: Session, account: Account) -> Self {
        Self {
            token: session.token,
            expires_at: session.expires_at,
            account_id: account.id,
            email: account.email,
            role: account.role,
        }
    }
}

/// Register a student account.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/auth/register \
///   -H "Content-Type: application/json" \
///   -d '{"email": "jane@uni.ac.ke", "password": "password123"}'
/// ```
pub async fn register(
    State(auth): State<Arc<AuthService>>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let account = auth.register(credentials).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            account_id: account.id,
            email: account.email,
        }),
    ))
}

/// Log in with any role.
pub async fn login(
    State(auth): State<Arc<AuthService>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<LoginResponse>, AppError> {
    let (session, account) = auth.login(credentials, None).await?;
    Ok(Json(LoginResponse::new(session, account)))
}

/// Log in to the admin panel; student accounts are refused.
pub async fn admin_login(
    State(auth): State<Arc<AuthService>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<LoginResponse>, AppError> {
    let (session, account) = auth.login(credentials, Some(Role::Admin)).await?;
    Ok(Json(LoginResponse::new(session, account)))
}

/// Delete the caller's session.
pub async fn logout(
    State(auth): State<Arc<AuthService>>,
    BearerToken(token): BearerToken,
) -> Result<StatusCode, AppError> {
    auth.logout(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}
