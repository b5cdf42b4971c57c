//! Row shapes read back from `PostgreSQL` and their conversion to domain records.

use chrono::{DateTime, Utc};
use hostel_core::account::{Account, Session};
use hostel_core::booking::{Balance, Booking, BookingDetails, Occupancy, Payment};
use hostel_core::error::{HostelError, Result};
use hostel_core::phone::PhoneNumber;
use hostel_core::profile::{ProfileDetails, StudentProfile};
use hostel_core::room::Room;
use hostel_core::types::{
    AccountId, BalanceId, BookingId, Money, OccupancyId, PaymentId, RoomId, StudentId,
};
use sqlx::types::Json;
use std::str::FromStr;
use uuid::Uuid;

/// Parse a text column holding one of the domain enums.
fn column<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr<Err = HostelError>,
{
    value
        .parse()
        .map_err(|e| HostelError::storage(format!("Corrupt {name} column: {e}")))
}

#[derive(sqlx::FromRow)]
pub(crate) struct AccountRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = HostelError;

    fn try_from(row: AccountRow) -> Result<Self> {
        Ok(Self {
            id: AccountId::from_uuid(row.id),
            email: row.email,
            password_hash: row.password_hash,
            role: column("role", &row.role)?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SessionRow {
    token: String,
    account_id: Uuid,
    role: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for Session {
    type Error = HostelError;

    fn try_from(row: SessionRow) -> Result<Self> {
        Ok(Self {
            token: row.token,
            account_id: AccountId::from_uuid(row.account_id),
            role: column("role", &row.role)?,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct RoomRow {
    id: Uuid,
    block: String,
    room_number: String,
    gender: String,
    capacity: i32,
    price: i64,
    photo_urls: Vec<String>,
    status: String,
}

impl TryFrom<RoomRow> for Room {
    type Error = HostelError;

    fn try_from(row: RoomRow) -> Result<Self> {
        Ok(Self {
            id: RoomId::from_uuid(row.id),
            block: row.block,
            room_number: row.room_number,
            gender: column("gender", &row.gender)?,
            capacity: u32::try_from(row.capacity)
                .map_err(|_| HostelError::storage("Corrupt capacity column"))?,
            price: Money::from_shillings(row.price),
            photo_urls: row.photo_urls,
            status: column("status", &row.status)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ProfileRow {
    id: Uuid,
    account_id: Uuid,
    full_name: String,
    phone_number: String,
    gender: String,
    details: Json<ProfileDetails>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for StudentProfile {
    type Error = HostelError;

    fn try_from(row: ProfileRow) -> Result<Self> {
        Ok(Self {
            id: StudentId::from_uuid(row.id),
            account_id: AccountId::from_uuid(row.account_id),
            full_name: row.full_name,
            phone_number: PhoneNumber::from_trusted(row.phone_number),
            gender: column("gender", &row.gender)?,
            details: row.details.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BookingRow {
    id: Uuid,
    student_id: Uuid,
    room_id: Uuid,
    status: String,
    checkout_request_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = HostelError;

    fn try_from(row: BookingRow) -> Result<Self> {
        Ok(Self {
            id: BookingId::from_uuid(row.id),
            student_id: StudentId::from_uuid(row.student_id),
            room_id: RoomId::from_uuid(row.room_id),
            status: column("status", &row.status)?,
            checkout_request_id: row.checkout_request_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BookingDetailsRow {
    #[sqlx(flatten)]
    booking: BookingRow,
    student_name: String,
    student_phone: String,
    student_email: Option<String>,
    room_block: String,
    room_number: String,
    room_price: i64,
}

impl TryFrom<BookingDetailsRow> for BookingDetails {
    type Error = HostelError;

    fn try_from(row: BookingDetailsRow) -> Result<Self> {
        Ok(Self {
            booking: row.booking.try_into()?,
            student_name: row.student_name,
            student_phone: PhoneNumber::from_trusted(row.student_phone),
            student_email: row.student_email,
            room_block: row.room_block,
            room_number: row.room_number,
            room_price: Money::from_shillings(row.room_price),
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct OccupancyRow {
    id: Uuid,
    student_id: Uuid,
    room_id: Uuid,
    booking_id: Uuid,
    move_in_date: DateTime<Utc>,
    expected_move_out_date: Option<DateTime<Utc>>,
    is_active: bool,
}

impl From<OccupancyRow> for Occupancy {
    fn from(row: OccupancyRow) -> Self {
        Self {
            id: OccupancyId::from_uuid(row.id),
            student_id: StudentId::from_uuid(row.student_id),
            room_id: RoomId::from_uuid(row.room_id),
            booking_id: BookingId::from_uuid(row.booking_id),
            move_in_date: row.move_in_date,
            expected_move_out_date: row.expected_move_out_date,
            is_active: row.is_active,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BalanceRow {
    id: Uuid,
    student_id: Uuid,
    current_balance: i64,
    updated_at: DateTime<Utc>,
}

impl From<BalanceRow> for Balance {
    fn from(row: BalanceRow) -> Self {
        Self {
            id: BalanceId::from_uuid(row.id),
            student_id: StudentId::from_uuid(row.student_id),
            current_balance: Money::from_shillings(row.current_balance),
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PaymentRow {
    id: Uuid,
    student_id: Uuid,
    booking_id: Uuid,
    amount: i64,
    mpesa_receipt: String,
    phone_number: String,
    merchant_request_id: Option<String>,
    status: String,
    paid_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = HostelError;

    fn try_from(row: PaymentRow) -> Result<Self> {
        Ok(Self {
            id: PaymentId::from_uuid(row.id),
            student_id: StudentId::from_uuid(row.student_id),
            booking_id: BookingId::from_uuid(row.booking_id),
            amount: Money::from_shillings(row.amount),
            mpesa_receipt: row.mpesa_receipt,
            phone_number: row.phone_number,
            merchant_request_id: row.merchant_request_id,
            status: column("status", &row.status)?,
            paid_at: row.paid_at,
        })
    }
}
