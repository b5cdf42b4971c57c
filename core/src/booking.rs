//! Bookings and the records an allocation creates.
//!
//! [`BookingReducer`] is the only place that decides whether a booking may
//! change status. Callers hand the resulting [`BookingTransition`] to
//! [`HostelStore::commit_transition`](crate::store::HostelStore::commit_transition),
//! which writes the booking and its effects atomically.

use crate::environment::Clock;
use crate::error::HostelError;
use crate::phone::PhoneNumber;
use crate::reducer::Reducer;
use crate::room::Room;
use crate::types::{
    BalanceId, BookingId, BookingStatus, Money, OccupancyId, PaymentId, PaymentStatus, RoomId,
    StudentId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

// ============================================================================
// Records
// ============================================================================

/// A student's request to occupy a room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Booking ID
    pub id: BookingId,
    /// Student who asked
    pub student_id: StudentId,
    /// Room asked for
    pub room_id: RoomId,
    /// Lifecycle status
    pub status: BookingStatus,
    /// Gateway correlation token from the last payment initiation
    pub checkout_request_id: Option<String>,
    /// Created
    pub created_at: DateTime<Utc>,
    /// Last status or token change
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// A fresh pending booking.
    #[must_use]
    pub fn new(student_id: StudentId, room_id: RoomId, now: DateTime<Utc>) -> Self {
        Self {
            id: BookingId::new(),
            student_id,
            room_id,
            status: BookingStatus::Pending,
            checkout_request_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A student assigned to a room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupancy {
    /// Occupancy ID
    pub id: OccupancyId,
    /// Occupant
    pub student_id: StudentId,
    /// Room occupied
    pub room_id: RoomId,
    /// Booking that produced this occupancy; at most one occupancy per booking
    pub booking_id: BookingId,
    /// Defaults to the allocation time
    pub move_in_date: DateTime<Utc>,
    /// Optional planned move-out
    pub expected_move_out_date: Option<DateTime<Utc>>,
    /// Cleared on move-out
    pub is_active: bool,
}

/// What a student owes. Positive is owed, negative is credit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// Balance ID
    pub id: BalanceId,
    /// Student; one balance per student
    pub student_id: StudentId,
    /// Current amount
    pub current_balance: Money,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

/// A payment confirmed by the gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Payment ID
    pub id: PaymentId,
    /// Payer
    pub student_id: StudentId,
    /// Booking paid for
    pub booking_id: BookingId,
    /// Amount received
    pub amount: Money,
    /// Gateway receipt number, unique; the idempotency key for callbacks
    pub mpesa_receipt: String,
    /// Paying phone as reported by the gateway
    pub phone_number: String,
    /// Gateway merchant request ID, when reported
    pub merchant_request_id: Option<String>,
    /// Completed or failed
    pub status: PaymentStatus,
    /// When the callback was processed
    pub paid_at: DateTime<Utc>,
}

impl Payment {
    /// A completed payment for `booking` from the gateway's receipt.
    #[must_use]
    pub fn completed(booking: &Booking, receipt: PaymentReceipt, now: DateTime<Utc>) -> Self {
        Self {
            id: PaymentId::new(),
            student_id: booking.student_id,
            booking_id: booking.id,
            amount: receipt.amount,
            mpesa_receipt: receipt.mpesa_receipt,
            phone_number: receipt.phone_number,
            merchant_request_id: receipt.merchant_request_id,
            status: PaymentStatus::Completed,
            paid_at: now,
        }
    }
}

/// Success details carried by a gateway callback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    /// Gateway transaction ID (`MpesaReceiptNumber`)
    pub mpesa_receipt: String,
    /// Amount paid
    pub amount: Money,
    /// Paying phone
    pub phone_number: String,
    /// `MerchantRequestID`
    pub merchant_request_id: Option<String>,
}

/// Admin and student view of a booking with its student and room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    /// The booking
    #[serde(flatten)]
    pub booking: Booking,
    /// Student's full name
    pub student_name: String,
    /// Student's phone
    pub student_phone: PhoneNumber,
    /// Student's login email
    pub student_email: Option<String>,
    /// Room block
    pub room_block: String,
    /// Room number
    pub room_number: String,
    /// Room monthly price
    pub room_price: Money,
}

// ============================================================================
// Actions and effects
// ============================================================================

/// Inputs to the booking lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BookingAction {
    /// Remember the gateway correlation token of a payment request
    AttachCheckout {
        /// `CheckoutRequestID` returned by the gateway
        checkout_request_id: String,
    },

    /// Admin override: allocate without payment
    Allocate {
        /// The booked room (for price and identity)
        room: Room,
    },

    /// Gateway reported a successful payment
    ConfirmPayment {
        /// The booked room
        room: Room,
        /// Payment details from the callback
        receipt: PaymentReceipt,
    },

    /// Gateway reported a failed or cancelled payment
    FailPayment {
        /// Gateway `ResultCode`
        result_code: i64,
        /// Gateway `ResultDesc`
        description: String,
    },

    /// Admin declined the booking
    Reject {
        /// Optional reason for the record
        reason: Option<String>,
    },
}

impl BookingAction {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AttachCheckout { .. } => "attach_checkout",
            Self::Allocate { .. } => "allocate",
            Self::ConfirmPayment { .. } => "confirm_payment",
            Self::FailPayment { .. } => "fail_payment",
            Self::Reject { .. } => "reject",
        }
    }
}

/// Records that must be written together with the booking change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BookingEffect {
    /// Insert an occupancy
    OpenOccupancy(Occupancy),
    /// Create the student's balance, or add to the existing one
    ChargeBalance(Balance),
    /// Insert a payment, unique by receipt
    RecordPayment(Payment),
}

/// A reduced booking ready to be committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingTransition {
    /// Booking after the action was applied
    pub booking: Booking,
    /// Status the stored booking must still have for the commit to apply
    pub expected_status: BookingStatus,
    /// Records to write in the same unit
    pub effects: SmallVec<[BookingEffect; 4]>,
}

impl BookingTransition {
    /// The payment receipt this transition records, if any.
    #[must_use]
    pub fn receipt(&self) -> Option<&str> {
        self.effects.iter().find_map(|effect| match effect {
            BookingEffect::RecordPayment(payment) => Some(payment.mpesa_receipt.as_str()),
            _ => None,
        })
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the booking lifecycle
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
}

impl BookingEnvironment {
    /// Creates a new `BookingEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the booking lifecycle.
#[derive(Clone, Copy, Debug, Default)]
pub struct BookingReducer;

impl BookingReducer {
    /// Creates a new `BookingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Reduce `action` against `booking` and package the result for a store.
    ///
    /// # Errors
    ///
    /// Same as [`Reducer::reduce`].
    pub fn transition(
        &self,
        mut booking: Booking,
        action: BookingAction,
        env: &BookingEnvironment,
    ) -> Result<BookingTransition, HostelError> {
        let expected_status = booking.status;
        let effects = self.reduce(&mut booking, action, env)?;
        Ok(BookingTransition {
            booking,
            expected_status,
            effects,
        })
    }

    fn require_pending(booking: &Booking, action: &BookingAction) -> Result<(), HostelError> {
        if booking.status == BookingStatus::Pending {
            Ok(())
        } else {
            Err(HostelError::invalid_state(format!(
                "Booking {} is {}, cannot {}",
                booking.id,
                booking.status,
                action.name()
            )))
        }
    }

    fn require_room(booking: &Booking, room: &Room) -> Result<(), HostelError> {
        if booking.room_id == room.id {
            Ok(())
        } else {
            Err(HostelError::Internal(format!(
                "Room {} does not belong to booking {}",
                room.id, booking.id
            )))
        }
    }

    fn allocation_effects(
        booking: &Booking,
        room: &Room,
        now: DateTime<Utc>,
    ) -> [BookingEffect; 2] {
        [
            BookingEffect::OpenOccupancy(Occupancy {
                id: OccupancyId::new(),
                student_id: booking.student_id,
                room_id: room.id,
                booking_id: booking.id,
                move_in_date: now,
                expected_move_out_date: None,
                is_active: true,
            }),
            BookingEffect::ChargeBalance(Balance {
                id: BalanceId::new(),
                student_id: booking.student_id,
                current_balance: room.price,
                updated_at: now,
            }),
        ]
    }
}

impl Reducer for BookingReducer {
    type State = Booking;
    type Action = BookingAction;
    type Environment = BookingEnvironment;
    type Effect = BookingEffect;
    type Error = HostelError;

    fn reduce(
        &self,
        state: &mut Booking,
        action: BookingAction,
        env: &BookingEnvironment,
    ) -> Result<SmallVec<[BookingEffect; 4]>, HostelError> {
        Self::require_pending(state, &action)?;
        let now = env.clock.now();

        match action {
            BookingAction::AttachCheckout {
                checkout_request_id,
            } => {
                if checkout_request_id.trim().is_empty() {
                    return Err(HostelError::validation("Empty checkout request id"));
                }
                state.checkout_request_id = Some(checkout_request_id);
                state.updated_at = now;
                Ok(SmallVec::new())
            }

            BookingAction::Allocate { room } => {
                Self::require_room(state, &room)?;
                state.status = BookingStatus::Allocated;
                state.updated_at = now;
                Ok(SmallVec::from_iter(Self::allocation_effects(state, &room, now)))
            }

            BookingAction::ConfirmPayment { room, receipt } => {
                Self::require_room(state, &room)?;
                state.status = BookingStatus::Allocated;
                state.updated_at = now;

                let payment = Payment::completed(state, receipt, now);
                let [occupancy, balance] = Self::allocation_effects(state, &room, now);
                Ok(smallvec![
                    BookingEffect::RecordPayment(payment),
                    occupancy,
                    balance
                ])
            }

            BookingAction::FailPayment { .. } => {
                state.status = BookingStatus::PaymentFailed;
                state.updated_at = now;
                Ok(SmallVec::new())
            }

            BookingAction::Reject { .. } => {
                state.status = BookingStatus::Rejected;
                state.updated_at = now;
                Ok(SmallVec::new())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::environment::SystemClock;
    use crate::types::{Gender, RoomStatus};

    fn env() -> BookingEnvironment {
        BookingEnvironment::new(Arc::new(SystemClock))
    }

    fn room(price: i64) -> Room {
        Room {
            id: RoomId::new(),
            block: "A".to_string(),
            room_number: "A101".to_string(),
            gender: Gender::Male,
            capacity: 2,
            price: Money::from_shillings(price),
            photo_urls: vec![],
            status: RoomStatus::Active,
        }
    }

    fn pending_for(room: &Room) -> Booking {
        Booking::new(StudentId::new(), room.id, Utc::now())
    }

    #[test]
    fn test_transition_records_expected_status_and_receipt() {
        let room = room(12_000);
        let booking = pending_for(&room);
        let transition = BookingReducer
            .transition(
                booking,
                BookingAction::ConfirmPayment {
                    room,
                    receipt: PaymentReceipt {
                        mpesa_receipt: "NLJ7RT61SV".to_string(),
                        amount: Money::from_shillings(12_000),
                        phone_number: "254712345678".to_string(),
                        merchant_request_id: None,
                    },
                },
                &env(),
            )
            .unwrap();

        assert_eq!(transition.expected_status, BookingStatus::Pending);
        assert_eq!(transition.booking.status, BookingStatus::Allocated);
        assert_eq!(transition.receipt(), Some("NLJ7RT61SV"));
        assert_eq!(transition.effects.len(), 3);
    }
}
