//! # Hostel Core
//!
//! Domain model and business rules for the student hostel booking service.
//!
//! The crate follows a "functional core, imperative shell" split: the booking
//! lifecycle is a pure [`reducer::Reducer`] that mutates a [`booking::Booking`]
//! and *describes* the records that must be written alongside it
//! ([`booking::BookingEffect`]). Stores ([`store::HostelStore`]) commit the
//! new booking state and every effect as one atomic unit, so the reducer
//! never touches I/O and stays testable at memory speed.
//!
//! ## Booking lifecycle
//!
//! ```text
//!              ┌──────────── Allocate (admin) ────────────┐
//!              │                                          ▼
//!  ┌─────────┐ ├──── ConfirmPayment (gateway callback) ─▶ allocated ──▶ Occupancy + Balance (+ Payment)
//!  │ pending │─┤
//!  └─────────┘ ├──── FailPayment (gateway callback) ────▶ payment_failed
//!              │
//!              └──── Reject (admin) ─────────────────────▶ rejected
//! ```
//!
//! Only `pending` has outgoing transitions. Stores enforce the same rule with a
//! conditional update, which is what prevents an admin allocation and a
//! payment callback from both allocating one booking.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod booking;
pub mod error;
pub mod gateway;
pub mod phone;
pub mod profile;
pub mod room;
pub mod store;
pub mod types;

pub use chrono::{DateTime, Utc};
pub use error::{HostelError, Result};
pub use smallvec::{SmallVec, smallvec};

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They contain the business rules, are deterministic, and never perform I/O.
pub mod reducer {
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    /// - `Effect`: Descriptions of writes the caller must perform
    /// - `Error`: Why an action was refused
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Effect descriptions returned to the caller
        type Effect;

        /// Refusal reason
        type Error;

        /// Reduce an action into state changes and effects
        ///
        /// 1. Validates the action against the current state
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` when the action is not valid for `state`.
        /// In that case `state` is left untouched.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<SmallVec<[Self::Effect; 4]>, Self::Error>;
    }
}

/// Environment module - Dependency injection traits
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use hostel_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
