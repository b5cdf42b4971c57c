//! Admin booking panel.
//!
//! - GET /api/admin/bookings?status=pending - Bookings with student and room
//! - POST /api/allocations - Allocate a pending booking without payment
//! - POST /api/admin/bookings/:id/reject - Decline a pending booking

use super::parse_id;
use crate::auth::RequireAdmin;
use crate::error::AppError;
use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use hostel_core::HostelError;
use hostel_core::booking::{Booking, BookingDetails};
use hostel_core::types::BookingStatus;
use serde::{Deserialize, Serialize};

/// Query parameters for listing bookings.
#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    /// Defaults to `pending`
    #[serde(default)]
    pub status: BookingStatus,
}

/// Allocation trigger body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRequest {
    /// Booking to allocate
    pub booking_id: Option<String>,
}

/// Optional rejection body.
#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    /// Kept in the logs
    pub reason: Option<String>,
}

/// Response after an admin decision.
#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    /// Success message
    pub message: String,
    /// The booking after the decision
    pub booking: Booking,
}

/// Bookings in one status, newest first.
pub async fn list_bookings(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    Ok(Json(state.bookings.list_bookings(query.status).await?))
}

/// Allocate a pending booking.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/allocations \
///   -H "Authorization: Bearer <admin_token>" \
///   -H "Content-Type: application/json" \
///   -d '{"bookingId": "<booking id>"}'
/// ```
pub async fn allocate(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(request): Json<AllocationRequest>,
) -> Result<Json<DecisionResponse>, AppError> {
    let booking_id = request
        .booking_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| HostelError::validation("bookingId is required"))?;
    let booking = state.bookings.allocate(parse_id(booking_id)?).await?;
    Ok(Json(DecisionResponse {
        message: "Room allocated successfully.".to_string(),
        booking,
    }))
}

/// Reject a pending booking.
pub async fn reject(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<RejectRequest>>,
) -> Result<Json<DecisionResponse>, AppError> {
    let reason = body
        .and_then(|Json(request)| request.reason)
        .filter(|reason| !reason.trim().is_empty());
    let booking = state.bookings.reject(parse_id(&id)?, reason).await?;
    Ok(Json(DecisionResponse {
        message: "Booking rejected.".to_string(),
        booking,
    }))
}
