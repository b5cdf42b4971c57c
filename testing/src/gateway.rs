//! Scriptable [`PaymentGateway`] for service and router tests.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use async_trait::async_trait;
use hostel_core::error::{HostelError, Result};
use hostel_core::gateway::{PaymentGateway, PaymentPrompt, PromptAccepted};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone)]
enum Mode {
    Accept,
    Fail(String),
}

/// Records every prompt and either accepts it with a fresh checkout ID or
/// fails with a fixed gateway message.
///
/// # Example
///
/// ```
/// use hostel_testing::MockPaymentGateway;
///
/// let gateway = MockPaymentGateway::failing("Invalid Access Token");
/// assert!(gateway.prompts().is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct MockPaymentGateway {
    mode: Arc<Mutex<Mode>>,
    prompts: Arc<Mutex<Vec<PaymentPrompt>>>,
    issued: Arc<Mutex<Vec<String>>>,
}

impl MockPaymentGateway {
    /// A gateway that accepts every prompt.
    #[must_use]
    pub fn accepting() -> Self {
        Self::with_mode(Mode::Accept)
    }

    /// A gateway that refuses every prompt with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_mode(Mode::Fail(message.into()))
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode: Arc::new(Mutex::new(mode)),
            prompts: Arc::new(Mutex::new(Vec::new())),
            issued: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Switch to refusing prompts.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.mode.lock().unwrap() = Mode::Fail(message.into());
    }

    /// Prompts received so far, accepted or not.
    #[must_use]
    pub fn prompts(&self) -> Vec<PaymentPrompt> {
        self.prompts.lock().unwrap().clone()
    }

    /// The most recently issued checkout request ID.
    #[must_use]
    pub fn last_checkout_id(&self) -> Option<String> {
        self.issued.lock().unwrap().last().cloned()
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::accepting()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn request_payment(&self, prompt: PaymentPrompt) -> Result<PromptAccepted> {
        self.prompts.lock().unwrap().push(prompt);
        let mode = self.mode.lock().unwrap().clone();
        match mode {
            Mode::Fail(message) => Err(HostelError::gateway(message)),
            Mode::Accept => {
                let checkout_request_id = format!("ws_CO_{}", Uuid::new_v4().simple());
                let merchant_request_id = format!("{}-1", Uuid::new_v4().simple());
                self.issued
                    .lock()
                    .unwrap()
                    .push(checkout_request_id.clone());
                Ok(PromptAccepted {
                    raw: serde_json::json!({
                        "MerchantRequestID": merchant_request_id,
                        "CheckoutRequestID": checkout_request_id,
                        "ResponseCode": "0",
                        "ResponseDescription": "Success. Request accepted for processing",
                        "CustomerMessage": "Success. Request accepted for processing"
                    }),
                    checkout_request_id,
                    merchant_request_id: Some(merchant_request_id),
                })
            }
        }
    }
}
