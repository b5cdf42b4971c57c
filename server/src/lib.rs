//! # Hostel Server
//!
//! HTTP service for a student hostel: students browse rooms, submit a booking
//! with their profile, pay through an M-Pesa STK push, and end up allocated
//! once Daraja confirms the payment or an admin allocates them directly.
//!
//! # Architecture
//!
//! ```text
//!  HTTP (axum)           Application services          Core
//! ┌──────────────┐      ┌────────────────────┐      ┌──────────────────┐
//! │ api::*       │─────▶│ BookingService     │─────▶│ BookingReducer   │
//! │ auth::*      │      │ RoomService        │      │ (pure lifecycle) │
//! └──────────────┘      │ AuthService        │      └──────────────────┘
//!                       └────────────────────┘
//!                          │              │
//!                          ▼              ▼
//!                  ┌──────────────┐ ┌────────────────┐
//!                  │ HostelStore  │ │ PaymentGateway │
//!                  │ (PostgreSQL) │ │ (Daraja)       │
//!                  └──────────────┘ └────────────────┘
//! ```
//!
//! Handlers stay thin: they authenticate, parse, and delegate. Every state
//! change goes through the reducer and is committed atomically with the
//! occupancy, balance and payment rows it implies.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
