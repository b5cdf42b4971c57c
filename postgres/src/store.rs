//! [`HostelStore`] backed by a `PostgreSQL` pool.

use crate::rows::{
    AccountRow, BalanceRow, BookingDetailsRow, BookingRow, OccupancyRow, PaymentRow, ProfileRow,
    RoomRow, SessionRow,
};
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
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const BOOKING_COLUMNS: &str =
    "b.id, b.student_id, b.room_id, b.status, b.checkout_request_id, b.created_at, b.updated_at";

const ROOM_COLUMNS: &str = "id, block, room_number, gender, capacity, price, photo_urls, status";

const PROFILE_COLUMNS: &str =
    "id, account_id, full_name, phone_number, gender, details, created_at, updated_at";

/// `numeric_value_out_of_range`
const OUT_OF_RANGE: &str = "22003";

/// Map a sqlx error, turning unique violations into [`HostelError::Conflict`]
/// and `bigint` overflow into [`HostelError::Validation`].
fn db_error(context: &str, e: &sqlx::Error) -> HostelError {
    if let sqlx::Error::Database(db_err) = e {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("unique constraint");
            return HostelError::conflict(format!("{context}: duplicate value violates {constraint}"));
        }
        if db_err.code().as_deref() == Some(OUT_OF_RANGE) {
            return HostelError::validation(format!("{context}: amount is out of range"));
        }
    }
    HostelError::storage(format!("{context}: {e}"))
}

fn capacity_column(capacity: u32) -> Result<i32> {
    i32::try_from(capacity).map_err(|_| HostelError::validation("Capacity is too large"))
}

/// Pool sizing for [`PostgresHostelStore::connect_with`].
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Upper bound on open connections
    pub max_connections: u32,
    /// Connections kept open when idle
    pub min_connections: u32,
    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// `PostgreSQL` store.
///
/// Cloning shares the pool.
#[derive(Clone, Debug)]
pub struct PostgresHostelStore {
    pool: PgPool,
}

impl PostgresHostelStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool with default settings and `max_connections`.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::Storage`] if the database is unreachable.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        Self::connect_with(
            database_url,
            &PoolConfig {
                max_connections,
                ..PoolConfig::default()
            },
        )
        .await
    }

    /// Connect a new pool.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::Storage`] if the database is unreachable.
    pub async fn connect_with(database_url: &str, config: &PoolConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| HostelError::storage(format!("Failed to connect: {e}")))?;
        Ok(Self::from_pool(pool))
    }

    /// Run embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::Storage`] if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| HostelError::storage(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn apply_effect(tx: &mut Transaction<'_, Postgres>, effect: &BookingEffect) -> Result<()> {
        match effect {
            BookingEffect::OpenOccupancy(occupancy) => {
                sqlx::query(
                    "INSERT INTO occupancies
                        (id, student_id, room_id, booking_id, move_in_date, expected_move_out_date, is_active)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)",
                )
                .bind(occupancy.id.as_uuid())
                .bind(occupancy.student_id.as_uuid())
                .bind(occupancy.room_id.as_uuid())
                .bind(occupancy.booking_id.as_uuid())
                .bind(occupancy.move_in_date)
                .bind(occupancy.expected_move_out_date)
                .bind(occupancy.is_active)
                .execute(&mut **tx)
                .await
                .map_err(|e| db_error("Failed to open occupancy", &e))?;
            }
            BookingEffect::ChargeBalance(balance) => {
                sqlx::query(
                    "INSERT INTO balances (id, student_id, current_balance, updated_at)
                     VALUES ($1, $2, $3, $4)
                     ON CONFLICT (student_id) DO UPDATE
                     SET current_balance = balances.current_balance + EXCLUDED.current_balance,
                         updated_at = EXCLUDED.updated_at",
                )
                .bind(balance.id.as_uuid())
                .bind(balance.student_id.as_uuid())
                .bind(balance.current_balance.shillings())
                .bind(balance.updated_at)
                .execute(&mut **tx)
                .await
                .map_err(|e| db_error("Failed to charge balance", &e))?;
            }
            BookingEffect::RecordPayment(payment) => {
                Self::insert_payment(&mut **tx, payment).await?;
            }
        }
        Ok(())
    }

    async fn insert_payment<'e, E>(executor: E, payment: &Payment) -> Result<()>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query(
            "INSERT INTO payments
                (id, student_id, booking_id, amount, mpesa_receipt, phone_number,
                 merchant_request_id, status, paid_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(payment.id.as_uuid())
        .bind(payment.student_id.as_uuid())
        .bind(payment.booking_id.as_uuid())
        .bind(payment.amount.shillings())
        .bind(&payment.mpesa_receipt)
        .bind(&payment.phone_number)
        .bind(&payment.merchant_request_id)
        .bind(payment.status.as_str())
        .bind(payment.paid_at)
        .execute(executor)
        .await
        .map_err(|e| db_error("Failed to record payment", &e))?;
        Ok(())
    }

    fn details_query(condition: &str) -> String {
        format!(
            "SELECT {BOOKING_COLUMNS},
                    s.full_name AS student_name,
                    s.phone_number AS student_phone,
                    a.email AS student_email,
                    r.block AS room_block,
                    r.room_number AS room_number,
                    r.price AS room_price
             FROM bookings b
             JOIN student_profiles s ON s.id = b.student_id
             JOIN rooms r ON r.id = b.room_id
             LEFT JOIN accounts a ON a.id = s.account_id
             WHERE {condition}
             ORDER BY b.created_at DESC"
        )
    }
}

#[async_trait]
impl HostelStore for PostgresHostelStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Ping failed", &e))?;
        Ok(())
    }

    async fn create_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            "INSERT INTO accounts (id, email, password_hash, role, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(account.id.as_uuid())
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create account", &e))?;
        Ok(())
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>> {
        sqlx::query_as::<_, AccountRow>(
            "SELECT id, email, password_hash, role, created_at FROM accounts WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get account", &e))?
        .map(Account::try_from)
        .transpose()
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        sqlx::query_as::<_, AccountRow>(
            "SELECT id, email, password_hash, role, created_at FROM accounts WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get account", &e))?
        .map(Account::try_from)
        .transpose()
    }

    async fn create_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (token, account_id, role, created_at, expires_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&session.token)
        .bind(session.account_id.as_uuid())
        .bind(session.role.as_str())
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create session", &e))?;
        Ok(())
    }

    async fn find_session(&self, token: &str) -> Result<Option<Session>> {
        sqlx::query_as::<_, SessionRow>(
            "SELECT token, account_id, role, created_at, expires_at FROM sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get session", &e))?
        .map(Session::try_from)
        .transpose()
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete session", &e))?;
        Ok(())
    }

    #[instrument(skip(self, rooms), fields(count = rooms.len()))]
    async fn insert_rooms(&self, rooms: &[Room]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", &e))?;

        for room in rooms {
            sqlx::query(&format!(
                "INSERT INTO rooms ({ROOM_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
            ))
            .bind(room.id.as_uuid())
            .bind(&room.block)
            .bind(&room.room_number)
            .bind(room.gender.as_str())
            .bind(capacity_column(room.capacity)?)
            .bind(room.price.shillings())
            .bind(&room.photo_urls)
            .bind(room.status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                db_error(
                    &format!("Failed to add room {} in block {}", room.room_number, room.block),
                    &e,
                )
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit rooms", &e))?;
        debug!(count = rooms.len(), "Inserted rooms");
        Ok(())
    }

    async fn get_room(&self, id: RoomId) -> Result<Option<Room>> {
        sqlx::query_as::<_, RoomRow>(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to get room", &e))?
            .map(Room::try_from)
            .transpose()
    }

    async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<Room>> {
        let capacity = filter.capacity.map(capacity_column).transpose()?;
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let rows = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms
             WHERE ($1 OR status = 'active')
               AND ($2::text IS NULL OR gender = $2)
               AND ($3::text IS NULL OR lower(block) = lower($3))
               AND ($4::integer IS NULL OR capacity = $4)
               AND ($5::bigint IS NULL OR price >= $5)
               AND ($6::bigint IS NULL OR price <= $6)
               AND ($7::text IS NULL
                    OR strpos(lower(room_number), lower($7)) > 0
                    OR strpos(lower(block), lower($7)) > 0)
             ORDER BY block, room_number"
        ))
        .bind(filter.include_inactive)
        .bind(filter.gender.map(|g| g.as_str()))
        .bind(filter.block.as_deref())
        .bind(capacity)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(search)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list rooms", &e))?;

        rows.into_iter().map(Room::try_from).collect()
    }

    async fn update_room(&self, room: &Room) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE rooms
             SET block = $2, room_number = $3, gender = $4, capacity = $5,
                 price = $6, photo_urls = $7, status = $8
             WHERE id = $1",
        )
        .bind(room.id.as_uuid())
        .bind(&room.block)
        .bind(&room.room_number)
        .bind(room.gender.as_str())
        .bind(capacity_column(room.capacity)?)
        .bind(room.price.shillings())
        .bind(&room.photo_urls)
        .bind(room.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update room", &e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, profile, now))]
    async fn upsert_profile(
        &self,
        account_id: AccountId,
        profile: ValidProfile,
        now: DateTime<Utc>,
    ) -> Result<StudentProfile> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "INSERT INTO student_profiles ({PROFILE_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
             ON CONFLICT (account_id) DO UPDATE
             SET full_name = EXCLUDED.full_name,
                 phone_number = EXCLUDED.phone_number,
                 gender = EXCLUDED.gender,
                 details = EXCLUDED.details,
                 updated_at = EXCLUDED.updated_at
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(StudentId::new().as_uuid())
        .bind(account_id.as_uuid())
        .bind(&profile.full_name)
        .bind(profile.phone_number.as_str())
        .bind(profile.gender.as_str())
        .bind(Json(&profile.details))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save profile", &e))?;

        row.try_into()
    }

    async fn find_profile_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Option<StudentProfile>> {
        sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM student_profiles WHERE account_id = $1"
        ))
        .bind(account_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get profile", &e))?
        .map(StudentProfile::try_from)
        .transpose()
    }

    #[instrument(skip(self, booking), fields(booking_id = %booking.id))]
    async fn insert_booking(&self, booking: &Booking) -> Result<()> {
        sqlx::query(
            "INSERT INTO bookings
                (id, student_id, room_id, status, checkout_request_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(booking.id.as_uuid())
        .bind(booking.student_id.as_uuid())
        .bind(booking.room_id.as_uuid())
        .bind(booking.status.as_str())
        .bind(&booking.checkout_request_id)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create booking", &e))?;
        Ok(())
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings b WHERE b.id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get booking", &e))?
        .map(Booking::try_from)
        .transpose()
    }

    async fn find_booking_by_checkout(
        &self,
        checkout_request_id: &str,
    ) -> Result<Option<Booking>> {
        sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings b
             WHERE b.checkout_request_id = $1
             ORDER BY b.updated_at DESC
             LIMIT 1"
        ))
        .bind(checkout_request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find booking by checkout", &e))?
        .map(Booking::try_from)
        .transpose()
    }

    async fn list_booking_details(
        &self,
        status: Option<BookingStatus>,
    ) -> Result<Vec<BookingDetails>> {
        let rows = sqlx::query_as::<_, BookingDetailsRow>(&Self::details_query(
            "($1::text IS NULL OR b.status = $1)",
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list bookings", &e))?;

        rows.into_iter().map(BookingDetails::try_from).collect()
    }

    async fn latest_booking_details(
        &self,
        student_id: StudentId,
    ) -> Result<Option<BookingDetails>> {
        let query = format!("{} LIMIT 1", Self::details_query("b.student_id = $1"));
        sqlx::query_as::<_, BookingDetailsRow>(&query)
            .bind(student_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to get latest booking", &e))?
            .map(BookingDetails::try_from)
            .transpose()
    }

    #[instrument(
        skip(self, transition),
        fields(
            booking_id = %transition.booking.id,
            status = %transition.booking.status,
            effects = transition.effects.len()
        )
    )]
    async fn commit_transition(&self, transition: &BookingTransition) -> Result<()> {
        let booking = &transition.booking;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", &e))?;

        let updated = sqlx::query(
            "UPDATE bookings
             SET status = $2, checkout_request_id = $3, updated_at = $4
             WHERE id = $1 AND status = $5",
        )
        .bind(booking.id.as_uuid())
        .bind(booking.status.as_str())
        .bind(&booking.checkout_request_id)
        .bind(booking.updated_at)
        .bind(transition.expected_status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to update booking", &e))?;

        if updated.rows_affected() == 0 {
            // Dropping `tx` rolls back.
            let stored: Option<(String,)> =
                sqlx::query_as("SELECT status FROM bookings WHERE id = $1")
                    .bind(booking.id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| db_error("Failed to read booking status", &e))?;
            return Err(match stored {
                None => HostelError::not_found("Booking", booking.id),
                Some((status,)) => {
                    warn!(
                        booking_id = %booking.id,
                        stored = %status,
                        expected = %transition.expected_status,
                        "Booking changed underneath transition"
                    );
                    HostelError::invalid_state(format!(
                        "Booking {} is {status}, expected {}",
                        booking.id, transition.expected_status
                    ))
                }
            });
        }

        for effect in &transition.effects {
            Self::apply_effect(&mut tx, effect).await?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transition", &e))?;

        debug!(
            booking_id = %booking.id,
            status = %booking.status,
            effects = transition.effects.len(),
            "Committed booking transition"
        );
        Ok(())
    }

    #[instrument(skip(self, payment), fields(booking_id = %payment.booking_id))]
    async fn record_payment(&self, payment: &Payment) -> Result<()> {
        Self::insert_payment(&self.pool, payment).await?;
        debug!(receipt = %payment.mpesa_receipt, "Recorded payment");
        Ok(())
    }

    async fn find_payment_by_receipt(&self, mpesa_receipt: &str) -> Result<Option<Payment>> {
        sqlx::query_as::<_, PaymentRow>(
            "SELECT id, student_id, booking_id, amount, mpesa_receipt, phone_number,
                    merchant_request_id, status, paid_at
             FROM payments WHERE mpesa_receipt = $1",
        )
        .bind(mpesa_receipt)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get payment", &e))?
        .map(Payment::try_from)
        .transpose()
    }

    async fn payments_for_booking(&self, booking_id: BookingId) -> Result<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            "SELECT id, student_id, booking_id, amount, mpesa_receipt, phone_number,
                    merchant_request_id, status, paid_at
             FROM payments WHERE booking_id = $1
             ORDER BY paid_at",
        )
        .bind(booking_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list payments", &e))?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn occupancies_for_student(&self, student_id: StudentId) -> Result<Vec<Occupancy>> {
        let rows = sqlx::query_as::<_, OccupancyRow>(
            "SELECT id, student_id, room_id, booking_id, move_in_date, expected_move_out_date, is_active
             FROM occupancies WHERE student_id = $1
             ORDER BY move_in_date DESC",
        )
        .bind(student_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list occupancies", &e))?;

        Ok(rows.into_iter().map(Occupancy::from).collect())
    }

    async fn balance_for_student(&self, student_id: StudentId) -> Result<Option<Balance>> {
        let row = sqlx::query_as::<_, BalanceRow>(
            "SELECT id, student_id, current_balance, updated_at FROM balances WHERE student_id = $1",
        )
        .bind(student_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get balance", &e))?;

        Ok(row.map(Balance::from))
    }
}
