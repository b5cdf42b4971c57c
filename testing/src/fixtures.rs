//! Ready-made records for tests.

#![allow(clippy::unwrap_used)] // Fixtures are built from known-good literals
#![allow(clippy::missing_panics_doc)]

use chrono::Utc;
use hostel_core::account::Account;
use hostel_core::booking::PaymentReceipt;
use hostel_core::profile::{ProfileDetails, ProfileInput, ValidProfile};
use hostel_core::room::Room;
use hostel_core::types::{AccountId, Gender, Money, Role, RoomId, RoomStatus};

/// An active, two-bed male room.
#[must_use]
pub fn room(block: &str, room_number: &str, price: i64) -> Room {
    Room {
        id: RoomId::new(),
        block: block.to_string(),
        room_number: room_number.to_string(),
        gender: Gender::Male,
        capacity: 2,
        price: Money::from_shillings(price),
        photo_urls: Vec::new(),
        status: RoomStatus::Active,
    }
}

/// A student account whose hash is not a real password hash.
#[must_use]
pub fn student_account(email: &str) -> Account {
    account(email, Role::Student)
}

/// An admin account whose hash is not a real password hash.
#[must_use]
pub fn admin_account(email: &str) -> Account {
    account(email, Role::Admin)
}

fn account(email: &str, role: Role) -> Account {
    Account {
        id: AccountId::new(),
        email: email.to_string(),
        password_hash: "not-a-hash".to_string(),
        role,
        created_at: Utc::now(),
    }
}

/// Complete profile input for the given phone.
#[must_use]
pub fn profile_input(phone: &str) -> ProfileInput {
    ProfileInput {
        full_name: Some("Jane Wanjiru".to_string()),
        phone_number: Some(phone.to_string()),
        gender: Some(Gender::Female),
        details: ProfileDetails {
            home_county: Some("Nyeri".to_string()),
            school: Some("Dedan Kimathi University".to_string()),
            course: Some("BSc Computer Science".to_string()),
            ..ProfileDetails::default()
        },
    }
}

/// [`profile_input`], validated.
#[must_use]
pub fn valid_profile(phone: &str) -> ValidProfile {
    profile_input(phone).validate().unwrap()
}

/// A successful payment receipt.
#[must_use]
pub fn receipt(mpesa_receipt: &str, amount: i64) -> PaymentReceipt {
    PaymentReceipt {
        mpesa_receipt: mpesa_receipt.to_string(),
        amount: Money::from_shillings(amount),
        phone_number: "254712345678".to_string(),
        merchant_request_id: Some("29115-34620561-1".to_string()),
    }
}
