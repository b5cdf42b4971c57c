//! Safaricom Daraja client for the hostel booking service.
//!
//! Provides [`DarajaClient`], an implementation of
//! [`PaymentGateway`](hostel_core::gateway::PaymentGateway) that sends
//! M-Pesa Express (STK push) prompts, and [`callback`] types for parsing the
//! asynchronous result webhook.
//!
//! # Example
//!
//! ```no_run
//! use hostel_mpesa::{DarajaClient, MpesaConfig};
//!
//! # fn example() -> Result<(), hostel_mpesa::MpesaError> {
//! let config = MpesaConfig::sandbox(
//!     "consumer-key",
//!     "consumer-secret",
//!     "174379",
//!     "passkey",
//!     "https://hostel.example.com/api/mpesa/callback",
//! );
//! let client = DarajaClient::new(config)?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod callback;
pub mod client;
pub mod error;
pub mod stk;

pub use callback::{CallbackAck, CallbackEnvelope};
pub use client::{DarajaClient, MpesaConfig, SANDBOX_URL};
pub use error::MpesaError;
