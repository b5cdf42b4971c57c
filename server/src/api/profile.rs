//! Student self-service endpoints.
//!
//! - GET /api/profile - Profile plus latest booking
//! - PUT /api/profile - Edit the profile
//! - GET /api/balance - Running balance

use crate::app::StudentOverview;
use crate::auth::SessionUser;
use crate::error::AppError;
use crate::server::state::AppState;
use axum::{Json, extract::State};
use hostel_core::booking::Balance;
use hostel_core::profile::{ProfileInput, StudentProfile};

/// The caller's profile and most recent booking; both `null` before the
/// first booking.
pub async fn get_profile(
    user: SessionUser,
    State(state): State<AppState>,
) -> Result<Json<StudentOverview>, AppError> {
    Ok(Json(state.bookings.overview(user.account_id).await?))
}

/// Edit the caller's existing profile.
pub async fn update_profile(
    user: SessionUser,
    State(state): State<AppState>,
    Json(input): Json<ProfileInput>,
) -> Result<Json<StudentProfile>, AppError> {
    Ok(Json(
        state.bookings.update_profile(user.account_id, input).await?,
    ))
}

/// The caller's balance.
pub async fn get_balance(
    user: SessionUser,
    State(state): State<AppState>,
) -> Result<Json<Balance>, AppError> {
    Ok(Json(state.bookings.balance(user.account_id).await?))
}
