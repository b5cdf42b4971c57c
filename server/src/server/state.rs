//! Application state for the hostel HTTP server.

use crate::app::{BookingService, RoomService};
use crate::auth::AuthService;
use axum::extract::FromRef;
use hostel_core::environment::Clock;
use hostel_core::gateway::PaymentGateway;
use hostel_core::store::HostelStore;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via Arc) for each request. Everything below it is built
/// from the same store, gateway and clock, so tests can swap all three.
#[derive(Clone)]
pub struct AppState {
    /// Backing store, also used by the readiness probe
    pub store: Arc<dyn HostelStore>,
    /// Accounts and sessions
    pub auth: Arc<AuthService>,
    /// Booking lifecycle
    pub bookings: Arc<BookingService>,
    /// Room catalog
    pub rooms: Arc<RoomService>,
}

impl AppState {
    /// Wire services over a store, a payment gateway and a clock.
    #[must_use]
    pub fn new(
        store: Arc<dyn HostelStore>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        session_ttl: chrono::Duration,
    ) -> Self {
        Self {
            auth: Arc::new(AuthService::new(store.clone(), clock.clone(), session_ttl)),
            bookings: Arc::new(BookingService::new(store.clone(), gateway, clock)),
            rooms: Arc::new(RoomService::new(store.clone())),
            store,
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth.clone()
    }
}
