//! Booking endpoints.
//!
//! - POST /api/bookings - Submit a booking with the student's profile
//! - GET /api/bookings/:id/status - Poll a booking's status

use super::parse_id;
use crate::auth::SessionUser;
use crate::error::AppError;
use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use hostel_core::HostelError;
use hostel_core::booking::Booking;
use hostel_core::profile::ProfileInput;
use hostel_core::types::BookingStatus;
use serde::{Deserialize, Serialize};

/// Booking submission: the room plus the student's profile fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    /// Room to book
    pub room_id: Option<String>,
    /// Profile fields, at the top level of the body
    #[serde(flatten)]
    pub profile: ProfileInput,
}

/// Response after creating a booking.
#[derive(Debug, Serialize)]
pub struct CreateBookingResponse {
    /// Success message
    pub message: String,
    /// The new booking
    pub booking: Booking,
}

/// Booking status response.
#[derive(Debug, Serialize, Deserialize)]
pub struct BookingStatusResponse {
    /// Current status
    pub status: BookingStatus,
}

/// Submit a booking.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/bookings \
///   -H "Authorization: Bearer <session_token>" \
///   -H "Content-Type: application/json" \
///   -d '{
///     "roomId": "550e8400-e29b-41d4-a716-446655440000",
///     "fullName": "Jane Wanjiru",
///     "phoneNumber": "0712345678",
///     "gender": "Female",
///     "course": "BSc Computer Science"
///   }'
/// ```
pub async fn create_booking(
    user: SessionUser,
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), AppError> {
    let room_id = request
        .room_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| HostelError::validation("roomId is required"))?;
    let booking = state
        .bookings
        .create_booking(user.account_id, parse_id(room_id)?, request.profile)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            message: "Booking request created successfully.".to_string(),
            booking,
        }),
    ))
}

/// Current status of one of the caller's bookings.
pub async fn booking_status(
    user: SessionUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookingStatusResponse>, AppError> {
    let status = state
        .bookings
        .booking_status(&user.session, parse_id(&id)?)
        .await?;
    Ok(Json(BookingStatusResponse { status }))
}
