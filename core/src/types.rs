//! Identifiers, enumerations and value objects for the hostel domain.

use crate::error::HostelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = HostelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self).map_err(|_| {
                    HostelError::validation(format!(
                        "Invalid {} '{s}'",
                        stringify!($name)
                    ))
                })
            }
        }
    };
}

define_id!(
    /// Unique identifier for a login account
    AccountId
);
define_id!(
    /// Unique identifier for a room
    RoomId
);
define_id!(
    /// Unique identifier for a student profile
    StudentId
);
define_id!(
    /// Unique identifier for a booking
    BookingId
);
define_id!(
    /// Unique identifier for an occupancy record
    OccupancyId
);
define_id!(
    /// Unique identifier for a balance ledger entry
    BalanceId
);
define_id!(
    /// Unique identifier for a recorded payment
    PaymentId
);

// ============================================================================
// Money
// ============================================================================

/// An amount in whole Kenyan shillings.
///
/// Signed so a [`Balance`](crate::booking::Balance) can go negative when a
/// student is in credit. M-Pesa only moves whole shillings, so there is no
/// fractional part.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero shillings
    pub const ZERO: Self = Self(0);

    /// Creates an amount from whole shillings
    #[must_use]
    pub const fn from_shillings(shillings: i64) -> Self {
        Self(shillings)
    }

    /// Returns the amount in whole shillings
    #[must_use]
    pub const fn shillings(&self) -> i64 {
        self.0
    }

    /// True for amounts below zero
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// True for amounts above zero
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Sum, or `None` when it leaves the `bigint` range
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Difference, or `None` when it leaves the `bigint` range
    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(diff) => Some(Self(diff)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KES {}", self.0)
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum using the
/// same spelling the database and JSON use.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Storage representation
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = HostelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(HostelError::validation(format!(
                        "Invalid {} '{other}'",
                        stringify!($name)
                    ))),
                }
            }
        }
    };
}

/// Role attached to a login account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular student; can browse, book and pay
    Student,
    /// Hostel administrator; manages rooms and allocations
    Admin,
}

string_enum!(Role { Student => "student", Admin => "admin" });

/// Gender restriction of a room, and gender of a student.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// Male
    Male,
    /// Female
    Female,
}

string_enum!(Gender { Male => "Male", Female => "Female" });

/// Whether a room is offered to students.
///
/// Rooms are never deleted; "deleting" one moves it to `Inactive`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Listed and bookable
    #[default]
    Active,
    /// Soft-deleted
    Inactive,
}

string_enum!(RoomStatus { Active => "active", Inactive => "inactive" });

/// Lifecycle of a booking.
///
/// `Pending` is the only non-terminal state; every other state is final.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Waiting for payment or an admin decision
    #[default]
    Pending,
    /// Confirmed; occupancy and balance exist
    Allocated,
    /// Declined by an admin
    Rejected,
    /// The gateway reported a failed payment
    PaymentFailed,
}

string_enum!(BookingStatus {
    Pending => "pending",
    Allocated => "allocated",
    Rejected => "rejected",
    PaymentFailed => "payment_failed",
});

impl BookingStatus {
    /// Terminal statuses have no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Outcome recorded on a payment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Money was received
    #[default]
    Completed,
    /// The payment did not go through
    Failed,
}

string_enum!(PaymentStatus { Completed => "completed", Failed => "failed" });

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_status_round_trips_storage_spelling() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Allocated,
            BookingStatus::Rejected,
            BookingStatus::PaymentFailed,
        ] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_only_pending_is_non_terminal() {
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(BookingStatus::Allocated.is_terminal());
        assert!(BookingStatus::Rejected.is_terminal());
        assert!(BookingStatus::PaymentFailed.is_terminal());
    }

    #[test]
    fn test_booking_status_json_spelling() {
        let json = serde_json::to_string(&BookingStatus::PaymentFailed).unwrap();
        assert_eq!(json, "\"payment_failed\"");
    }

    #[test]
    fn test_gender_rejects_unknown_value() {
        assert!("Other".parse::<Gender>().is_err());
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
    }

    #[test]
    fn test_id_parse_rejects_garbage() {
        assert!("not-a-uuid".parse::<BookingId>().is_err());
        let id = BookingId::new();
        assert_eq!(id.to_string().parse::<BookingId>().unwrap(), id);
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_shillings(15_000);
        let b = Money::from_shillings(20_000);
        assert_eq!(a.checked_sub(b).unwrap().shillings(), -5_000);
        assert!(a.checked_sub(b).unwrap().is_negative());
        assert_eq!(a.checked_add(b), Some(Money::from_shillings(35_000)));
        assert_eq!(a.to_string(), "KES 15000");
    }

    #[test]
    fn test_money_overflow_is_reported() {
        let near_max = Money::from_shillings(i64::MAX - 10);
        assert_eq!(near_max.checked_add(Money::from_shillings(11)), None);
        assert_eq!(
            Money::from_shillings(i64::MIN).checked_sub(Money::from_shillings(1)),
            None
        );
    }
}
