//! Application layer between HTTP handlers and the domain.

pub mod services;

pub use services::{
    BookingService, CallbackOutcome, PaymentRequest, RoomService, StudentOverview,
};
