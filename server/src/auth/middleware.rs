//! Authentication extractors.
//!
//! - [`BearerToken`]: raw token from `Authorization: Bearer <token>`
//! - [`SessionUser`]: a live session (students and admins)
//! - [`RequireAdmin`]: a live admin session
//!
//! ```rust,ignore
//! async fn pending_bookings(
//!     RequireAdmin(admin): RequireAdmin,
//!     State(state): State<AppState>,
//! ) -> Result<Json<Vec<BookingDetails>>, AppError> { ... }
//! ```

use crate::error::AppError;
use crate::server::state::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use hostel_core::account::Session;
use hostel_core::types::{AccountId, Role};

/// Bearer token extracted from `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                AppError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'")
            })?
            .trim();

        if token.is_empty() {
            return Err(AppError::unauthorized("Empty bearer token"));
        }

        Ok(Self(token.to_string()))
    }
}

/// Authenticated session user.
#[derive(Debug, Clone)]
pub struct SessionUser {
    /// The authenticated account
    pub account_id: AccountId,
    /// Role recorded on the session
    pub role: Role,
    /// The full session
    pub session: Session,
}

impl SessionUser {
    /// True for admin sessions.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state).await?;
        let session = state.auth.authenticate(&bearer.0).await?;
        Ok(Self {
            account_id: session.account_id,
            role: session.role,
            session,
        })
    }
}

/// Admin-only session.
///
/// Rejects valid non-admin sessions with 403.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub SessionUser);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = SessionUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::forbidden("Admin access required"));
        }
        Ok(Self(user))
    }
}
