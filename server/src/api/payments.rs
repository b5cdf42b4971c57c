//! M-Pesa endpoints.
//!
//! - POST /api/mpesa/stkpush - Prompt the student's phone for payment
//! - POST /api/mpesa/callback - Daraja result webhook (public)

use crate::app::PaymentRequest;
use crate::auth::SessionUser;
use crate::error::AppError;
use crate::metrics::PAYMENT_CALLBACKS;
use crate::server::state::AppState;
use axum::{Json, body::Bytes, extract::State};
use hostel_core::HostelError;
use hostel_core::phone::PhoneNumber;
use hostel_core::types::Money;
use hostel_mpesa::{CallbackAck, CallbackEnvelope};
use serde::Deserialize;
use tracing::{error, warn};

/// Payment initiation body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StkPushRequest {
    /// Payer phone in any accepted local form
    #[serde(alias = "phoneNumber")]
    pub phone: Option<String>,
    /// Whole shillings
    pub amount: Option<i64>,
    /// Booking being paid for
    pub booking_id: Option<String>,
}

impl StkPushRequest {
    /// Check presence, normalize the phone and parse the booking ID.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::Validation`] naming what is wrong.
    pub fn validate(self) -> Result<PaymentRequest, HostelError> {
        let phone = self.phone.filter(|p| !p.trim().is_empty());
        let booking_id = self.booking_id.filter(|b| !b.trim().is_empty());
        let (Some(phone), Some(amount), Some(booking_id)) = (phone, self.amount, booking_id) else {
            return Err(HostelError::validation(
                "Phone number, amount and bookingId are required",
            ));
        };
        if amount <= 0 {
            return Err(HostelError::validation("Amount must be greater than zero"));
        }
        Ok(PaymentRequest {
            phone: PhoneNumber::parse(&phone)?,
            amount: Money::from_shillings(amount),
            booking_id: booking_id.trim().parse()?,
        })
    }
}

/// Send an STK push and return Daraja's response body as is.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/mpesa/stkpush \
///   -H "Authorization: Bearer <session_token>" \
///   -H "Content-Type: application/json" \
///   -d '{"phone": "0712345678", "amount": 15000, "bookingId": "<booking id>"}'
/// ```
pub async fn stk_push(
    user: SessionUser,
    State(state): State<AppState>,
    Json(request): Json<StkPushRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let request = request.validate()?;
    let accepted = state
        .bookings
        .initiate_payment(&user.session, request)
        .await?;
    Ok(Json(accepted.raw))
}

/// Daraja result webhook.
///
/// Always answers `200 {"ResultCode":0,"ResultDesc":"Accepted"}`; problems
/// are logged and counted, never returned.
pub async fn callback(State(state): State<AppState>, body: Bytes) -> Json<CallbackAck> {
    let parsed = CallbackEnvelope::parse(&body).and_then(CallbackEnvelope::into_notification);
    let notification = match parsed {
        Ok(notification) => notification,
        Err(e) => {
            warn!(error = %e, "Malformed M-Pesa callback");
            metrics::counter!(PAYMENT_CALLBACKS, "outcome" => "malformed").increment(1);
            return Json(CallbackAck::default());
        }
    };

    let checkout_request_id = notification.checkout_request_id.clone();
    match state.bookings.handle_callback(notification).await {
        Ok(_) => {}
        Err(HostelError::NotFound { .. }) => {
            warn!(%checkout_request_id, "Callback for unknown checkout request");
            metrics::counter!(PAYMENT_CALLBACKS, "outcome" => "unknown_booking").increment(1);
        }
        Err(e) => {
            error!(%checkout_request_id, error = %e, "Failed to apply M-Pesa callback");
            metrics::counter!(PAYMENT_CALLBACKS, "outcome" => "error").increment(1);
        }
    }
    Json(CallbackAck::default())
}
