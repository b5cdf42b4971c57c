//! In-memory [`HostelStore`] for fast, deterministic tests.
//!
//! Every table lives behind one `RwLock`, so `commit_transition` sees and
//! writes a consistent snapshot the same way a database transaction would.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hostel_core::account::{Account, Session};
use hostel_core::booking::{
    Balance, Booking, BookingDetails, BookingEffect, BookingTransition, Occupancy, Payment,
};
use hostel_core::error::{HostelError, Result};
use hostel_core::profile::{StudentProfile, ValidProfile};
use hostel_core::room::{Room, RoomFilter};
use hostel_core::store::HostelStore;
use hostel_core::types::{AccountId, BookingId, BookingStatus, RoomId, StudentId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    sessions: HashMap<String, Session>,
    rooms: HashMap<RoomId, Room>,
    profiles: HashMap<StudentId, StudentProfile>,
    // Insertion order doubles as the tiebreaker for equal timestamps.
    bookings: Vec<Booking>,
    occupancies: Vec<Occupancy>,
    balances: HashMap<StudentId, Balance>,
    payments: Vec<Payment>,
}

impl Tables {
    fn details(&self, booking: &Booking) -> Option<BookingDetails> {
        let profile = self.profiles.get(&booking.student_id)?;
        let room = self.rooms.get(&booking.room_id)?;
        Some(BookingDetails {
            booking: booking.clone(),
            student_name: profile.full_name.clone(),
            student_phone: profile.phone_number.clone(),
            student_email: self
                .accounts
                .get(&profile.account_id)
                .map(|a| a.email.clone()),
            room_block: room.block.clone(),
            room_number: room.room_number.clone(),
            room_price: room.price,
        })
    }

    fn newest_first(&self) -> Vec<&Booking> {
        let mut bookings: Vec<&Booking> = self.bookings.iter().rev().collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bookings
    }
}

/// `HashMap`-backed store with the same constraints as the Postgres schema.
///
/// Cloning shares the underlying tables.
///
/// # Example
///
/// ```
/// use hostel_testing::InMemoryHostelStore;
/// use hostel_core::store::HostelStore;
/// use hostel_core::room::RoomFilter;
///
/// # async fn example() -> hostel_core::Result<()> {
/// let store = InMemoryHostelStore::new();
/// assert!(store.list_rooms(&RoomFilter::active_only()).await?.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryHostelStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryHostelStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rooms, active or not.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.tables.read().unwrap().rooms.len()
    }

    /// Number of bookings.
    #[must_use]
    pub fn booking_count(&self) -> usize {
        self.tables.read().unwrap().bookings.len()
    }

    /// Number of occupancies.
    #[must_use]
    pub fn occupancy_count(&self) -> usize {
        self.tables.read().unwrap().occupancies.len()
    }

    /// Number of payments.
    #[must_use]
    pub fn payment_count(&self) -> usize {
        self.tables.read().unwrap().payments.len()
    }

    /// Number of balances.
    #[must_use]
    pub fn balance_count(&self) -> usize {
        self.tables.read().unwrap().balances.len()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.tables.read().unwrap().sessions.len()
    }
}

#[async_trait]
impl HostelStore for InMemoryHostelStore {
    async fn create_account(&self, account: &Account) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        if tables.accounts.values().any(|a| a.email == account.email) {
            return Err(HostelError::conflict(format!(
                "Account '{}' already exists",
                account.email
            )));
        }
        tables.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.tables.read().unwrap().accounts.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn create_session(&self, session: &Session) -> Result<()> {
        self.tables
            .write()
            .unwrap()
            .sessions
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token: &str) -> Result<Option<Session>> {
        Ok(self.tables.read().unwrap().sessions.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        self.tables.write().unwrap().sessions.remove(token);
        Ok(())
    }

    async fn insert_rooms(&self, rooms: &[Room]) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        for (i, room) in rooms.iter().enumerate() {
            let clash = tables
                .rooms
                .values()
                .chain(rooms[..i].iter())
                .any(|r| r.block == room.block && r.room_number == room.room_number);
            if clash {
                return Err(HostelError::conflict(format!(
                    "Room {} already exists in block {}",
                    room.room_number, room.block
                )));
            }
        }
        for room in rooms {
            tables.rooms.insert(room.id, room.clone());
        }
        Ok(())
    }

    async fn get_room(&self, id: RoomId) -> Result<Option<Room>> {
        Ok(self.tables.read().unwrap().rooms.get(&id).cloned())
    }

    async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<Room>> {
        let tables = self.tables.read().unwrap();
        let mut rooms: Vec<Room> = tables
            .rooms
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        rooms.sort_by(|a, b| {
            a.block
                .cmp(&b.block)
                .then_with(|| a.room_number.cmp(&b.room_number))
        });
        Ok(rooms)
    }

    async fn update_room(&self, room: &Room) -> Result<bool> {
        let mut tables = self.tables.write().unwrap();
        if !tables.rooms.contains_key(&room.id) {
            return Ok(false);
        }
        let clash = tables.rooms.values().any(|r| {
            r.id != room.id && r.block == room.block && r.room_number == room.room_number
        });
        if clash {
            return Err(HostelError::conflict(format!(
                "Room {} already exists in block {}",
                room.room_number, room.block
            )));
        }
        tables.rooms.insert(room.id, room.clone());
        Ok(true)
    }

    async fn upsert_profile(
        &self,
        account_id: AccountId,
        profile: ValidProfile,
        now: DateTime<Utc>,
    ) -> Result<StudentProfile> {
        let mut tables = self.tables.write().unwrap();
        let existing = tables
            .profiles
            .values()
            .find(|p| p.account_id == account_id)
            .cloned();

        let phone_taken = tables
            .profiles
            .values()
            .any(|p| p.account_id != account_id && p.phone_number == profile.phone_number);
        if phone_taken {
            return Err(HostelError::conflict(format!(
                "Phone number {} is already registered",
                profile.phone_number
            )));
        }

        let stored = StudentProfile {
            id: existing.as_ref().map_or_else(StudentId::new, |p| p.id),
            account_id,
            full_name: profile.full_name,
            phone_number: profile.phone_number,
            gender: profile.gender,
            details: profile.details,
            created_at: existing.as_ref().map_or(now, |p| p.created_at),
            updated_at: now,
        };
        tables.profiles.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_profile_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Option<StudentProfile>> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .profiles
            .values()
            .find(|p| p.account_id == account_id)
            .cloned())
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        if tables.bookings.iter().any(|b| b.id == booking.id) {
            return Err(HostelError::conflict(format!(
                "Booking {} already exists",
                booking.id
            )));
        }
        tables.bookings.push(booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .bookings
            .iter()
            .find(|b| b.id == id)
            .cloned())
    }

    async fn find_booking_by_checkout(
        &self,
        checkout_request_id: &str,
    ) -> Result<Option<Booking>> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .bookings
            .iter()
            .find(|b| b.checkout_request_id.as_deref() == Some(checkout_request_id))
            .cloned())
    }

    async fn list_booking_details(
        &self,
        status: Option<BookingStatus>,
    ) -> Result<Vec<BookingDetails>> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .newest_first()
            .into_iter()
            .filter(|b| status.is_none_or(|s| b.status == s))
            .filter_map(|b| tables.details(b))
            .collect())
    }

    async fn latest_booking_details(
        &self,
        student_id: StudentId,
    ) -> Result<Option<BookingDetails>> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .newest_first()
            .into_iter()
            .find(|b| b.student_id == student_id)
            .and_then(|b| tables.details(b)))
    }

    async fn commit_transition(&self, transition: &BookingTransition) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        let booking = &transition.booking;

        // Validate everything before the first write.
        let index = tables
            .bookings
            .iter()
            .position(|b| b.id == booking.id)
            .ok_or_else(|| HostelError::not_found("Booking", booking.id))?;
        let stored = tables.bookings[index].status;
        if stored != transition.expected_status {
            return Err(HostelError::invalid_state(format!(
                "Booking {} is {stored}, expected {}",
                booking.id, transition.expected_status
            )));
        }
        for effect in &transition.effects {
            match effect {
                BookingEffect::RecordPayment(payment)
                    if tables
                        .payments
                        .iter()
                        .any(|p| p.mpesa_receipt == payment.mpesa_receipt) =>
                {
                    return Err(HostelError::conflict(format!(
                        "Payment {} already recorded",
                        payment.mpesa_receipt
                    )));
                }
                BookingEffect::OpenOccupancy(occupancy)
                    if tables
                        .occupancies
                        .iter()
                        .any(|o| o.booking_id == occupancy.booking_id) =>
                {
                    return Err(HostelError::conflict(format!(
                        "Booking {} already has an occupancy",
                        occupancy.booking_id
                    )));
                }
                _ => {}
            }
        }
        let mut charged = Vec::new();
        for effect in &transition.effects {
            if let BookingEffect::ChargeBalance(charge) = effect {
                let balance = match tables.balances.get(&charge.student_id) {
                    Some(existing) => Balance {
                        current_balance: existing
                            .current_balance
                            .checked_add(charge.current_balance)
                            .ok_or_else(|| {
                                HostelError::validation("Balance is out of range")
                            })?,
                        updated_at: charge.updated_at,
                        ..existing.clone()
                    },
                    None => charge.clone(),
                };
                charged.push(balance);
            }
        }

        tables.bookings[index] = booking.clone();
        for balance in charged {
            tables.balances.insert(balance.student_id, balance);
        }
        for effect in &transition.effects {
            match effect {
                BookingEffect::OpenOccupancy(occupancy) => {
                    tables.occupancies.push(occupancy.clone());
                }
                BookingEffect::ChargeBalance(_) => {}
                BookingEffect::RecordPayment(payment) => {
                    tables.payments.push(payment.clone());
                }
            }
        }
        Ok(())
    }

    async fn record_payment(&self, payment: &Payment) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        if tables
            .payments
            .iter()
            .any(|p| p.mpesa_receipt == payment.mpesa_receipt)
        {
            return Err(HostelError::conflict(format!(
                "Payment {} already recorded",
                payment.mpesa_receipt
            )));
        }
        tables.payments.push(payment.clone());
        Ok(())
    }

    async fn find_payment_by_receipt(&self, mpesa_receipt: &str) -> Result<Option<Payment>> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .payments
            .iter()
            .find(|p| p.mpesa_receipt == mpesa_receipt)
            .cloned())
    }

    async fn payments_for_booking(&self, booking_id: BookingId) -> Result<Vec<Payment>> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .payments
            .iter()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn occupancies_for_student(&self, student_id: StudentId) -> Result<Vec<Occupancy>> {
        let tables = self.tables.read().unwrap();
        let mut occupancies: Vec<Occupancy> = tables
            .occupancies
            .iter()
            .rev()
            .filter(|o| o.student_id == student_id)
            .cloned()
            .collect();
        occupancies.sort_by(|a, b| b.move_in_date.cmp(&a.move_in_date));
        Ok(occupancies)
    }

    async fn balance_for_student(&self, student_id: StudentId) -> Result<Option<Balance>> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .balances
            .get(&student_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use hostel_core::booking::{BookingAction, BookingEnvironment, BookingReducer, PaymentReceipt};
    use hostel_core::types::Money;

    async fn seeded() -> (InMemoryHostelStore, Room, Booking) {
        let store = InMemoryHostelStore::new();
        let room = fixtures::room("A", "A101", 15_000);
        store.insert_rooms(&[room.clone()]).await.unwrap();
        let account = fixtures::student_account("jane@example.com");
        store.create_account(&account).await.unwrap();
        let profile = store
            .upsert_profile(account.id, fixtures::valid_profile("0712345678"), Utc::now())
            .await
            .unwrap();
        let booking = Booking::new(profile.id, room.id, Utc::now());
        store.insert_booking(&booking).await.unwrap();
        (store, room, booking)
    }

    fn env() -> BookingEnvironment {
        BookingEnvironment::new(Arc::new(crate::test_clock()))
    }

    #[tokio::test]
    async fn test_duplicate_room_in_batch_inserts_nothing() {
        let store = InMemoryHostelStore::new();
        let rooms = [
            fixtures::room("A", "A1", 100),
            fixtures::room("A", "A2", 100),
            fixtures::room("A", "A1", 100),
        ];
        let err = store.insert_rooms(&rooms).await.unwrap_err();
        assert!(matches!(err, HostelError::Conflict(_)));
        assert_eq!(store.room_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = InMemoryHostelStore::new();
        store
            .create_account(&fixtures::student_account("a@b.co"))
            .await
            .unwrap();
        let err = store
            .create_account(&fixtures::student_account("a@b.co"))
            .await
            .unwrap_err();
        assert!(matches!(err, HostelError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_stale_transition_writes_nothing() {
        let (store, room, booking) = seeded().await;
        let first = BookingReducer
            .transition(booking.clone(), BookingAction::Allocate { room: room.clone() }, &env())
            .unwrap();
        let second = BookingReducer
            .transition(booking, BookingAction::Allocate { room }, &env())
            .unwrap();

        store.commit_transition(&first).await.unwrap();
        let err = store.commit_transition(&second).await.unwrap_err();

        assert!(matches!(err, HostelError::InvalidState(_)));
        assert_eq!(store.occupancy_count(), 1);
        assert_eq!(store.balance_count(), 1);
    }

    #[tokio::test]
    async fn test_charge_adds_to_existing_balance() {
        let (store, room, booking) = seeded().await;
        let transition = BookingReducer
            .transition(booking.clone(), BookingAction::Allocate { room: room.clone() }, &env())
            .unwrap();
        store.commit_transition(&transition).await.unwrap();

        let again = Booking::new(booking.student_id, room.id, Utc::now());
        store.insert_booking(&again).await.unwrap();
        let transition = BookingReducer
            .transition(again, BookingAction::Allocate { room }, &env())
            .unwrap();
        store.commit_transition(&transition).await.unwrap();

        let balance = store
            .balance_for_student(booking.student_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(balance.current_balance, Money::from_shillings(30_000));
        assert_eq!(store.balance_count(), 1);
    }

    #[tokio::test]
    async fn test_known_receipt_conflicts() {
        let (store, room, booking) = seeded().await;
        let receipt = PaymentReceipt {
            mpesa_receipt: "NLJ7RT61SV".to_string(),
            amount: Money::from_shillings(15_000),
            phone_number: "254712345678".to_string(),
            merchant_request_id: None,
        };
        let paid = BookingReducer
            .transition(
                booking.clone(),
                BookingAction::ConfirmPayment {
                    room: room.clone(),
                    receipt: receipt.clone(),
                },
                &env(),
            )
            .unwrap();
        store.commit_transition(&paid).await.unwrap();

        let other = Booking::new(booking.student_id, room.id, Utc::now());
        store.insert_booking(&other).await.unwrap();
        let replay = BookingReducer
            .transition(other.clone(), BookingAction::ConfirmPayment { room, receipt }, &env())
            .unwrap();
        let err = store.commit_transition(&replay).await.unwrap_err();

        assert!(matches!(err, HostelError::Conflict(_)));
        assert_eq!(store.payment_count(), 1);
        let untouched = store.get_booking(other.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_balance_overflow_writes_nothing() {
        let (store, _room, booking) = seeded().await;
        let pricey = fixtures::room("B", "B1", i64::MAX - 5);
        let cheap = fixtures::room("B", "B2", 10);
        store.insert_rooms(&[pricey.clone(), cheap.clone()]).await.unwrap();

        let first = Booking::new(booking.student_id, pricey.id, Utc::now());
        store.insert_booking(&first).await.unwrap();
        let transition = BookingReducer
            .transition(first, BookingAction::Allocate { room: pricey }, &env())
            .unwrap();
        store.commit_transition(&transition).await.unwrap();

        let second = Booking::new(booking.student_id, cheap.id, Utc::now());
        store.insert_booking(&second).await.unwrap();
        let transition = BookingReducer
            .transition(second.clone(), BookingAction::Allocate { room: cheap }, &env())
            .unwrap();
        let err = store.commit_transition(&transition).await.unwrap_err();

        assert!(matches!(err, HostelError::Validation(_)));
        assert_eq!(store.occupancy_count(), 1);
        let balance = store
            .balance_for_student(booking.student_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(balance.current_balance, Money::from_shillings(i64::MAX - 5));
        let untouched = store.get_booking(second.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_recorded_payment_is_unique_by_receipt() {
        let (store, _room, booking) = seeded().await;
        let payment = Payment::completed(
            &booking,
            fixtures::receipt("NLJ7RT61SV", 15_000),
            Utc::now(),
        );

        store.record_payment(&payment).await.unwrap();
        let again = Payment::completed(
            &booking,
            fixtures::receipt("NLJ7RT61SV", 15_000),
            Utc::now(),
        );
        let err = store.record_payment(&again).await.unwrap_err();

        assert!(matches!(err, HostelError::Conflict(_)));
        assert_eq!(store.payment_count(), 1);
        assert_eq!(store.payments_for_booking(booking.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_booking_details_join_student_and_room() {
        let (store, _room, booking) = seeded().await;
        let details = store
            .list_booking_details(Some(BookingStatus::Pending))
            .await
            .unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].booking.id, booking.id);
        assert_eq!(details[0].room_number, "A101");
        assert_eq!(details[0].student_email.as_deref(), Some("jane@example.com"));

        let allocated = store
            .list_booking_details(Some(BookingStatus::Allocated))
            .await
            .unwrap();
        assert!(allocated.is_empty());
    }

    #[tokio::test]
    async fn test_profile_phone_is_unique_across_accounts() {
        let (store, _room, _booking) = seeded().await;
        let other = fixtures::student_account("john@example.com");
        store.create_account(&other).await.unwrap();
        let err = store
            .upsert_profile(other.id, fixtures::valid_profile("+254712345678"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, HostelError::Conflict(_)));
    }
}
