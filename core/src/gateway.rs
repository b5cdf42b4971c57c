//! Mobile-money gateway abstraction.
//!
//! The service only needs two things from a gateway: start a payment prompt on
//! the student's phone, and later understand the asynchronous result. The
//! concrete M-Pesa client lives in `hostel-mpesa`; tests use the mock in
//! `hostel-testing`.

use crate::booking::PaymentReceipt;
use crate::error::Result;
use crate::phone::PhoneNumber;
use crate::types::Money;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A request to prompt a phone for payment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentPrompt {
    /// Canonical payer phone
    pub phone: PhoneNumber,
    /// Amount to collect
    pub amount: Money,
    /// Shown to the payer and echoed on statements
    pub account_reference: String,
    /// Free-form description
    pub description: String,
}

/// The gateway accepted a prompt for processing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromptAccepted {
    /// Correlation token (`CheckoutRequestID`) the callback will carry
    pub checkout_request_id: String,
    /// `MerchantRequestID`, when provided
    pub merchant_request_id: Option<String>,
    /// The gateway's response body, returned to the caller untouched
    pub raw: serde_json::Value,
}

/// Result notification delivered by the gateway to the webhook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentNotification {
    /// Correlation token from the original prompt
    pub checkout_request_id: String,
    /// `MerchantRequestID`
    pub merchant_request_id: Option<String>,
    /// `0` means success
    pub result_code: i64,
    /// Human-readable result
    pub result_desc: String,
    /// Present on success
    pub receipt: Option<PaymentReceipt>,
}

impl PaymentNotification {
    /// `ResultCode` value that signals success.
    pub const SUCCESS: i64 = 0;

    /// True when the gateway reported success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result_code == Self::SUCCESS
    }
}

/// Payment gateway trait
///
/// Implementations make exactly one attempt per call; retries are a caller
/// policy.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Send a payment prompt.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::Gateway`](crate::HostelError::Gateway) carrying
    /// the gateway's own message when one is available.
    async fn request_payment(&self, prompt: PaymentPrompt) -> Result<PromptAccepted>;
}
