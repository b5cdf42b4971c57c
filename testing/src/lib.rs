//! # Hostel Testing
//!
//! Testing utilities for the hostel booking service.
//!
//! This crate provides:
//! - [`InMemoryHostelStore`]: `HashMap`-backed [`HostelStore`](hostel_core::store::HostelStore)
//! - [`MockPaymentGateway`]: records prompts, succeeds or fails on demand
//! - [`FixedClock`] / [`test_clock`]: deterministic time
//! - [`ReducerTest`]: Given/When/Then harness for reducers
//! - [`fixtures`]: ready-made rooms, accounts and profile input
//!
//! ## Example
//!
//! ```
//! use hostel_testing::{InMemoryHostelStore, fixtures};
//! use hostel_core::store::HostelStore;
//!
//! # async fn example() -> hostel_core::Result<()> {
//! let store = InMemoryHostelStore::new();
//! store.insert_rooms(&[fixtures::room("A", "A101", 15_000)]).await?;
//! assert_eq!(store.room_count(), 1);
//! # Ok(())
//! # }
//! ```

pub mod fixtures;
pub mod gateway;
pub mod store;

use chrono::{DateTime, Utc};
use hostel_core::environment::Clock;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until [`FixedClock::advance`] moves it.
    ///
    /// # Example
    ///
    /// ```
    /// use hostel_testing::mocks::FixedClock;
    /// use hostel_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug)]
    pub struct FixedClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward.
        #[allow(clippy::unwrap_used)] // Test infrastructure
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap();
            *time += by;
        }
    }

    impl Clock for FixedClock {
        #[allow(clippy::unwrap_used)] // Test infrastructure
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use gateway::MockPaymentGateway;
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
pub use store::InMemoryHostelStore;
