//! Application services: load state, run the booking reducer, commit.
//!
//! Every status change goes through the same three steps:
//! 1. Load the booking (and its room) from the store
//! 2. Reduce the action into a [`BookingTransition`]
//! 3. Commit the transition atomically; the store re-checks the status
//!
//! Step 3 is what keeps an admin allocation and a payment callback from
//! both allocating the same booking.

use crate::metrics::{ALLOCATIONS, BOOKINGS_CREATED, PAYMENT_CALLBACKS};
use hostel_core::account::Session;
use hostel_core::booking::{
    Balance, Booking, BookingAction, BookingDetails, BookingEnvironment, BookingReducer,
    BookingTransition, Payment, PaymentReceipt,
};
use hostel_core::environment::Clock;
use hostel_core::gateway::{PaymentGateway, PaymentNotification, PaymentPrompt, PromptAccepted};
use hostel_core::phone::PhoneNumber;
use hostel_core::profile::{ProfileInput, StudentProfile};
use hostel_core::room::{BulkRoomInput, Room, RoomFilter, RoomInput};
use hostel_core::store::HostelStore;
use hostel_core::types::{AccountId, BookingId, BookingStatus, Money, Role, RoomId, RoomStatus};
use hostel_core::{HostelError, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Shown on the payer's phone and on statements.
pub const ACCOUNT_REFERENCE: &str = "Hostel Room Payment";

/// Description sent with every payment prompt.
pub const TRANSACTION_DESC: &str = "Payment for a hostel room";

/// A validated payment initiation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Canonical payer phone
    pub phone: PhoneNumber,
    /// Amount to collect
    pub amount: Money,
    /// Booking being paid for
    pub booking_id: BookingId,
}

/// What a payment callback did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Payment recorded, booking allocated
    Allocated,
    /// Booking moved to `payment_failed`
    PaymentFailed,
    /// The receipt was already processed; nothing written
    Duplicate,
    /// The booking had already left `pending`; the payment was recorded on
    /// its own and the allocation left as it was
    Recorded,
    /// The booking had already left `pending`; nothing written
    Ignored,
}

impl CallbackOutcome {
    /// Metric label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Allocated => "allocated",
            Self::PaymentFailed => "payment_failed",
            Self::Duplicate => "duplicate",
            Self::Recorded => "recorded",
            Self::Ignored => "ignored",
        }
    }
}

/// A student's profile with their latest booking.
#[derive(Clone, Debug, Serialize)]
pub struct StudentOverview {
    /// `None` until the student books for the first time
    pub profile: Option<StudentProfile>,
    /// Most recent booking with room details
    pub booking: Option<BookingDetails>,
}

// ============================================================================
// Bookings
// ============================================================================

/// Booking lifecycle service.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn HostelStore>,
    gateway: Arc<dyn PaymentGateway>,
    reducer: BookingReducer,
    env: BookingEnvironment,
}

impl BookingService {
    /// Create a new booking service.
    #[must_use]
    pub fn new(
        store: Arc<dyn HostelStore>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            gateway,
            reducer: BookingReducer::new(),
            env: BookingEnvironment::new(clock),
        }
    }

    /// Upsert the account's profile and open a pending booking for `room_id`.
    ///
    /// # Errors
    ///
    /// - [`HostelError::NotFound`] if the account or room does not exist
    /// - [`HostelError::InvalidState`] if the room is inactive
    /// - [`HostelError::Validation`] if required profile fields are missing
    /// - [`HostelError::Conflict`] if the phone belongs to another student
    #[instrument(skip(self, profile), fields(account_id = %account_id, room_id = %room_id))]
    pub async fn create_booking(
        &self,
        account_id: AccountId,
        room_id: RoomId,
        profile: ProfileInput,
    ) -> Result<Booking> {
        if self.store.find_account(account_id).await?.is_none() {
            return Err(HostelError::not_found("Account", account_id));
        }
        let room = self.load_room(room_id).await?;
        if !room.is_active() {
            return Err(HostelError::invalid_state(format!(
                "Room {} in block {} is not available",
                room.room_number, room.block
            )));
        }
        let profile = profile.validate()?;

        let now = self.env.clock.now();
        let student = self.store.upsert_profile(account_id, profile, now).await?;
        let booking = Booking::new(student.id, room.id, now);
        self.store.insert_booking(&booking).await?;

        metrics::counter!(BOOKINGS_CREATED).increment(1);
        info!(booking_id = %booking.id, student_id = %student.id, "Booking created");
        Ok(booking)
    }

    /// Send an STK push for a pending booking and remember its correlation token.
    ///
    /// Students may only pay for their own bookings.
    ///
    /// # Errors
    ///
    /// - [`HostelError::NotFound`] if the booking does not exist (or is not
    ///   the caller's)
    /// - [`HostelError::InvalidState`] if the booking is no longer pending
    /// - [`HostelError::Gateway`] if the gateway refuses; not retried
    #[instrument(skip(self, caller, request), fields(booking_id = %request.booking_id))]
    pub async fn initiate_payment(
        &self,
        caller: &Session,
        request: PaymentRequest,
    ) -> Result<PromptAccepted> {
        let booking = self.load_visible_booking(caller, request.booking_id).await?;
        if booking.status != BookingStatus::Pending {
            return Err(HostelError::invalid_state(format!(
                "Booking {} is {}, cannot initiate payment",
                booking.id, booking.status
            )));
        }

        let accepted = self
            .gateway
            .request_payment(PaymentPrompt {
                phone: request.phone,
                amount: request.amount,
                account_reference: ACCOUNT_REFERENCE.to_string(),
                description: TRANSACTION_DESC.to_string(),
            })
            .await?;

        let transition = self.reducer.transition(
            booking,
            BookingAction::AttachCheckout {
                checkout_request_id: accepted.checkout_request_id.clone(),
            },
            &self.env,
        )?;
        self.store.commit_transition(&transition).await?;

        info!(
            checkout_request_id = %accepted.checkout_request_id,
            amount = request.amount.shillings(),
            "Payment prompt sent"
        );
        Ok(accepted)
    }

    /// Apply a gateway result notification.
    ///
    /// A success records the payment, occupancy and balance together with
    /// the allocation; a failure only moves the booking to `payment_failed`.
    /// Redelivered receipts change nothing. A success for a booking that
    /// already left `pending` records the payment alone; a failure for one
    /// changes nothing.
    ///
    /// # Errors
    ///
    /// - [`HostelError::NotFound`] if no booking carries the correlation token
    /// - [`HostelError::Validation`] if a success carries no receipt
    #[instrument(
        skip(self, notification),
        fields(
            checkout_request_id = %notification.checkout_request_id,
            result_code = notification.result_code
        )
    )]
    pub async fn handle_callback(
        &self,
        notification: PaymentNotification,
    ) -> Result<CallbackOutcome> {
        let booking = self
            .store
            .find_booking_by_checkout(&notification.checkout_request_id)
            .await?
            .ok_or_else(|| HostelError::not_found("Booking", &notification.checkout_request_id))?;

        let action = if notification.is_success() {
            let receipt = notification
                .receipt
                .ok_or_else(|| HostelError::validation("Successful callback without a receipt"))?;
            if self
                .store
                .find_payment_by_receipt(&receipt.mpesa_receipt)
                .await?
                .is_some()
            {
                info!(receipt = %receipt.mpesa_receipt, "Receipt already processed");
                return Ok(record_outcome(CallbackOutcome::Duplicate));
            }
            let room = self.load_room(booking.room_id).await?;
            BookingAction::ConfirmPayment { room, receipt }
        } else {
            BookingAction::FailPayment {
                result_code: notification.result_code,
                description: notification.result_desc,
            }
        };

        let booking_id = booking.id;
        let late_receipt = match &action {
            BookingAction::ConfirmPayment { receipt, .. } => Some(receipt.clone()),
            _ => None,
        };
        let transition = match self.reducer.transition(booking.clone(), action, &self.env) {
            Ok(transition) => transition,
            Err(HostelError::InvalidState(reason)) => {
                warn!(%booking_id, %reason, "Callback for a booking that is no longer pending");
                let outcome = self.settle_late_payment(&booking, late_receipt).await?;
                return Ok(record_outcome(outcome));
            }
            Err(e) => return Err(e),
        };

        let outcome = match self.store.commit_transition(&transition).await {
            Ok(()) if transition.booking.status == BookingStatus::Allocated => {
                metrics::counter!(ALLOCATIONS, "path" => "payment").increment(1);
                CallbackOutcome::Allocated
            }
            Ok(()) => CallbackOutcome::PaymentFailed,
            Err(HostelError::Conflict(reason)) if transition.receipt().is_some() => {
                info!(%booking_id, %reason, "Concurrent delivery already recorded this payment");
                CallbackOutcome::Duplicate
            }
            Err(HostelError::InvalidState(reason)) => {
                warn!(%booking_id, %reason, "Booking left pending before the callback committed");
                self.settle_late_payment(&booking, late_receipt).await?
            }
            Err(e) => return Err(e),
        };

        info!(%booking_id, outcome = outcome.as_str(), "Payment callback applied");
        Ok(record_outcome(outcome))
    }

    /// Keep the money trail for a booking that was decided without this
    /// payment. Occupancy and balance are left alone.
    async fn settle_late_payment(
        &self,
        booking: &Booking,
        receipt: Option<PaymentReceipt>,
    ) -> Result<CallbackOutcome> {
        let Some(receipt) = receipt else {
            return Ok(CallbackOutcome::Ignored);
        };
        let payment = Payment::completed(booking, receipt, self.env.clock.now());
        match self.store.record_payment(&payment).await {
            Ok(()) => {
                warn!(
                    booking_id = %booking.id,
                    receipt = %payment.mpesa_receipt,
                    amount = %payment.amount,
                    "Payment recorded for a booking that was already decided"
                );
                Ok(CallbackOutcome::Recorded)
            }
            Err(HostelError::Conflict(reason)) => {
                info!(booking_id = %booking.id, %reason, "Concurrent delivery already recorded this payment");
                Ok(CallbackOutcome::Duplicate)
            }
            Err(e) => Err(e),
        }
    }

    /// Admin override: allocate a pending booking without payment.
    ///
    /// # Errors
    ///
    /// - [`HostelError::NotFound`] if the booking or its room does not exist
    /// - [`HostelError::InvalidState`] if the booking is not pending
    #[instrument(skip(self))]
    pub async fn allocate(&self, booking_id: BookingId) -> Result<Booking> {
        let booking = self.load_booking(booking_id).await?;
        let room = self.load_room(booking.room_id).await?;
        let transition = self
            .reducer
            .transition(booking, BookingAction::Allocate { room }, &self.env)?;
        self.commit(&transition).await?;

        metrics::counter!(ALLOCATIONS, "path" => "admin").increment(1);
        info!(%booking_id, "Booking allocated by admin");
        Ok(transition.booking)
    }

    /// Admin decision: decline a pending booking.
    ///
    /// # Errors
    ///
    /// - [`HostelError::NotFound`] if the booking does not exist
    /// - [`HostelError::InvalidState`] if the booking is not pending
    #[instrument(skip(self))]
    pub async fn reject(&self, booking_id: BookingId, reason: Option<String>) -> Result<Booking> {
        let booking = self.load_booking(booking_id).await?;
        let transition = self
            .reducer
            .transition(booking, BookingAction::Reject { reason: reason.clone() }, &self.env)?;
        self.commit(&transition).await?;

        info!(%booking_id, reason = reason.as_deref().unwrap_or(""), "Booking rejected");
        Ok(transition.booking)
    }

    /// Status of a booking the caller may see.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::NotFound`] for unknown bookings and for other
    /// students' bookings.
    pub async fn booking_status(
        &self,
        caller: &Session,
        booking_id: BookingId,
    ) -> Result<BookingStatus> {
        Ok(self.load_visible_booking(caller, booking_id).await?.status)
    }

    /// Bookings with student and room details, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn list_bookings(&self, status: BookingStatus) -> Result<Vec<BookingDetails>> {
        self.store.list_booking_details(Some(status)).await
    }

    /// The caller's profile and latest booking.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn overview(&self, account_id: AccountId) -> Result<StudentOverview> {
        let Some(profile) = self.store.find_profile_by_account(account_id).await? else {
            return Ok(StudentOverview {
                profile: None,
                booking: None,
            });
        };
        let booking = self.store.latest_booking_details(profile.id).await?;
        Ok(StudentOverview {
            profile: Some(profile),
            booking,
        })
    }

    /// Edit an existing profile in place.
    ///
    /// # Errors
    ///
    /// - [`HostelError::NotFound`] if the account has no profile yet
    /// - [`HostelError::Validation`] for missing fields or a bad phone
    /// - [`HostelError::Conflict`] if the phone belongs to another student
    pub async fn update_profile(
        &self,
        account_id: AccountId,
        input: ProfileInput,
    ) -> Result<StudentProfile> {
        if self.store.find_profile_by_account(account_id).await?.is_none() {
            return Err(HostelError::not_found("StudentProfile", account_id));
        }
        let profile = input.validate()?;
        self.store
            .upsert_profile(account_id, profile, self.env.clock.now())
            .await
    }

    /// The caller's running balance.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::NotFound`] when the caller has no profile or
    /// no allocation yet.
    pub async fn balance(&self, account_id: AccountId) -> Result<Balance> {
        let profile = self
            .store
            .find_profile_by_account(account_id)
            .await?
            .ok_or_else(|| HostelError::not_found("StudentProfile", account_id))?;
        self.store
            .balance_for_student(profile.id)
            .await?
            .ok_or_else(|| HostelError::not_found("Balance", profile.id))
    }

    async fn load_booking(&self, booking_id: BookingId) -> Result<Booking> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| HostelError::not_found("Booking", booking_id))
    }

    /// Admins see every booking, students only their own.
    async fn load_visible_booking(&self, caller: &Session, booking_id: BookingId) -> Result<Booking> {
        let booking = self.load_booking(booking_id).await?;
        if caller.role == Role::Admin {
            return Ok(booking);
        }
        let owner = self.store.find_profile_by_account(caller.account_id).await?;
        if owner.is_some_and(|profile| profile.id == booking.student_id) {
            Ok(booking)
        } else {
            Err(HostelError::not_found("Booking", booking_id))
        }
    }

    async fn load_room(&self, room_id: RoomId) -> Result<Room> {
        self.store
            .get_room(room_id)
            .await?
            .ok_or_else(|| HostelError::not_found("Room", room_id))
    }

    async fn commit(&self, transition: &BookingTransition) -> Result<()> {
        self.store.commit_transition(transition).await
    }
}

fn record_outcome(outcome: CallbackOutcome) -> CallbackOutcome {
    metrics::counter!(PAYMENT_CALLBACKS, "outcome" => outcome.as_str()).increment(1);
    outcome
}

// ============================================================================
// Rooms
// ============================================================================

/// Room catalog service.
#[derive(Clone)]
pub struct RoomService {
    store: Arc<dyn HostelStore>,
}

impl RoomService {
    /// Create a new room service.
    #[must_use]
    pub fn new(store: Arc<dyn HostelStore>) -> Self {
        Self { store }
    }

    /// Add one room.
    ///
    /// # Errors
    ///
    /// - [`HostelError::Validation`] for invalid attributes
    /// - [`HostelError::Conflict`] if the block already has that room number
    pub async fn create(&self, input: RoomInput) -> Result<Room> {
        let room = input.into_room(RoomId::new())?;
        self.store.insert_rooms(std::slice::from_ref(&room)).await?;
        info!(room_id = %room.id, block = %room.block, room_number = %room.room_number, "Room created");
        Ok(room)
    }

    /// Add a numbered range of rooms, all or nothing.
    ///
    /// # Errors
    ///
    /// - [`HostelError::Validation`] for a reversed or oversized range
    /// - [`HostelError::Conflict`] if any generated room already exists
    pub async fn create_bulk(&self, input: BulkRoomInput) -> Result<Vec<Room>> {
        let rooms = input.into_rooms()?;
        self.store.insert_rooms(&rooms).await?;
        info!(count = rooms.len(), "Rooms created in bulk");
        Ok(rooms)
    }

    /// Replace a room's attributes; may re-activate it.
    ///
    /// # Errors
    ///
    /// - [`HostelError::NotFound`] if the room does not exist
    /// - [`HostelError::Validation`] for invalid attributes
    /// - [`HostelError::Conflict`] if the new number is taken in the block
    pub async fn update(&self, id: RoomId, input: RoomInput) -> Result<Room> {
        let room = input.into_room(id)?;
        if !self.store.update_room(&room).await? {
            return Err(HostelError::not_found("Room", id));
        }
        info!(room_id = %id, status = %room.status, "Room updated");
        Ok(room)
    }

    /// Soft-delete: mark the room inactive.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::NotFound`] if the room does not exist.
    pub async fn deactivate(&self, id: RoomId) -> Result<Room> {
        let mut room = self
            .store
            .get_room(id)
            .await?
            .ok_or_else(|| HostelError::not_found("Room", id))?;
        room.status = RoomStatus::Inactive;
        if !self.store.update_room(&room).await? {
            return Err(HostelError::not_found("Room", id));
        }
        info!(room_id = %id, "Room deactivated");
        Ok(room)
    }

    /// A room students may see.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::NotFound`] for unknown or inactive rooms.
    pub async fn get_active(&self, id: RoomId) -> Result<Room> {
        self.store
            .get_room(id)
            .await?
            .filter(Room::is_active)
            .ok_or_else(|| HostelError::not_found("Room", id))
    }

    /// Rooms matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn list(&self, filter: &RoomFilter) -> Result<Vec<Room>> {
        self.store.list_rooms(filter).await
    }
}
