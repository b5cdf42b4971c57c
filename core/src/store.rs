//! Storage abstraction for the hostel service.
//!
//! # Implementations
//!
//! - `PostgresHostelStore` (in `hostel-postgres`): production implementation
//! - `InMemoryHostelStore` (in `hostel-testing`): fast, deterministic testing
//!
//! # Atomicity
//!
//! Single-record methods are atomic on their own. The only multi-record write
//! is [`HostelStore::commit_transition`], which must apply the booking change
//! and every effect as one unit, gated on the stored booking still having
//! [`BookingTransition::expected_status`].

use crate::account::{Account, Session};
use crate::booking::{Balance, Booking, BookingDetails, BookingTransition, Occupancy, Payment};
use crate::error::Result;
use crate::profile::{StudentProfile, ValidProfile};
use crate::room::{Room, RoomFilter};
use crate::types::{AccountId, BookingId, BookingStatus, RoomId, StudentId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persistence for accounts, rooms, profiles, bookings and the allocation ledger.
///
/// Unique-constraint violations surface as
/// [`HostelError::Conflict`](crate::HostelError::Conflict).
#[async_trait]
pub trait HostelStore: Send + Sync {
    /// Check the backing store answers, for readiness probes.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accounts and sessions
    // ------------------------------------------------------------------

    /// Insert an account. Emails are unique.
    async fn create_account(&self, account: &Account) -> Result<()>;

    /// Account by ID.
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>>;

    /// Account by (already lower-cased) email.
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Persist a newly issued session.
    async fn create_session(&self, session: &Session) -> Result<()>;

    /// Session by bearer token, expired or not.
    async fn find_session(&self, token: &str) -> Result<Option<Session>>;

    /// Remove a session; removing an unknown token is not an error.
    async fn delete_session(&self, token: &str) -> Result<()>;

    // ------------------------------------------------------------------
    // Rooms
    // ------------------------------------------------------------------

    /// Insert rooms, all or nothing. `(block, room_number)` is unique.
    async fn insert_rooms(&self, rooms: &[Room]) -> Result<()>;

    /// Room by ID, active or not.
    async fn get_room(&self, id: RoomId) -> Result<Option<Room>>;

    /// Rooms matching `filter`, ordered by block then room number.
    async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<Room>>;

    /// Overwrite a room. Returns `false` when no room has that ID.
    async fn update_room(&self, room: &Room) -> Result<bool>;

    // ------------------------------------------------------------------
    // Student profiles
    // ------------------------------------------------------------------

    /// Create the account's profile, or update it in place. Phones are unique.
    async fn upsert_profile(
        &self,
        account_id: AccountId,
        profile: ValidProfile,
        now: DateTime<Utc>,
    ) -> Result<StudentProfile>;

    /// Profile owned by an account.
    async fn find_profile_by_account(&self, account_id: AccountId)
    -> Result<Option<StudentProfile>>;

    // ------------------------------------------------------------------
    // Bookings
    // ------------------------------------------------------------------

    /// Insert a new booking.
    async fn insert_booking(&self, booking: &Booking) -> Result<()>;

    /// Booking by ID.
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>>;

    /// Booking carrying a gateway correlation token.
    async fn find_booking_by_checkout(&self, checkout_request_id: &str)
    -> Result<Option<Booking>>;

    /// Bookings joined with student and room, newest first, optionally by status.
    async fn list_booking_details(
        &self,
        status: Option<BookingStatus>,
    ) -> Result<Vec<BookingDetails>>;

    /// A student's most recent booking joined with student and room.
    async fn latest_booking_details(&self, student_id: StudentId)
    -> Result<Option<BookingDetails>>;

    /// Apply a reduced transition atomically.
    ///
    /// Fails with [`HostelError::InvalidState`](crate::HostelError::InvalidState)
    /// and writes nothing when the stored booking no longer has the expected
    /// status, and with [`HostelError::Conflict`](crate::HostelError::Conflict)
    /// and writes nothing when a recorded payment's receipt already exists.
    async fn commit_transition(&self, transition: &BookingTransition) -> Result<()>;

    // ------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------

    /// Insert a payment on its own, without touching the booking.
    ///
    /// Used when a payment arrives for a booking that was already decided.
    /// Fails with [`HostelError::Conflict`](crate::HostelError::Conflict)
    /// when the receipt is already recorded.
    async fn record_payment(&self, payment: &Payment) -> Result<()>;

    /// Payment by gateway receipt.
    async fn find_payment_by_receipt(&self, mpesa_receipt: &str) -> Result<Option<Payment>>;

    /// Payments recorded against a booking.
    async fn payments_for_booking(&self, booking_id: BookingId) -> Result<Vec<Payment>>;

    /// Occupancies of a student, newest first.
    async fn occupancies_for_student(&self, student_id: StudentId) -> Result<Vec<Occupancy>>;

    /// The student's balance, if one was opened.
    async fn balance_for_student(&self, student_id: StudentId) -> Result<Option<Balance>>;
}
