//! Daraja API client implementation

use crate::error::MpesaError;
use crate::stk::{self, ErrorBody, StkPushRequest, StkPushResponse, TokenResponse};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use hostel_core::environment::{Clock, SystemClock};
use hostel_core::gateway::{PaymentGateway, PaymentPrompt, PromptAccepted};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Safaricom sandbox base URL.
pub const SANDBOX_URL: &str = "https://sandbox.safaricom.co.ke";

/// Cached tokens are dropped this long before Daraja says they expire.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// Longest a token is trusted, whatever `expires_in` says.
const MAX_TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// Daraja credentials and endpoint settings.
#[derive(Clone, Debug)]
pub struct MpesaConfig {
    /// API base URL, without trailing slash
    pub base_url: String,
    /// App consumer key
    pub consumer_key: String,
    /// App consumer secret
    pub consumer_secret: String,
    /// Paybill or till number
    pub business_short_code: String,
    /// Lipa na M-Pesa passkey
    pub passkey: String,
    /// Public URL of the callback webhook
    pub callback_url: String,
    /// `CustomerPayBillOnline` or `CustomerBuyGoodsOnline`
    pub transaction_type: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl MpesaConfig {
    /// Sandbox defaults with the given credentials.
    #[must_use]
    pub fn sandbox(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        business_short_code: impl Into<String>,
        passkey: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            base_url: SANDBOX_URL.to_string(),
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            business_short_code: business_short_code.into(),
            passkey: passkey.into(),
            callback_url: callback_url.into(),
            transaction_type: "CustomerPayBillOnline".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Daraja API client
///
/// One attempt per call, bounded by [`MpesaConfig::timeout`]. Access tokens
/// are reused until shortly before they expire.
#[derive(Clone)]
pub struct DarajaClient {
    client: Client,
    config: MpesaConfig,
    clock: Arc<dyn Clock>,
    token: Arc<Mutex<Option<CachedToken>>>,
}

impl std::fmt::Debug for DarajaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DarajaClient")
            .field("base_url", &self.config.base_url)
            .field("business_short_code", &self.config.business_short_code)
            .finish_non_exhaustive()
    }
}

impl DarajaClient {
    /// Create a client using wall-clock time.
    ///
    /// # Errors
    ///
    /// Returns [`MpesaError::RequestFailed`] if the HTTP client cannot be built.
    pub fn new(config: MpesaConfig) -> Result<Self, MpesaError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a client with an injected clock.
    ///
    /// # Errors
    ///
    /// Returns [`MpesaError::RequestFailed`] if the HTTP client cannot be built.
    pub fn with_clock(config: MpesaConfig, clock: Arc<dyn Clock>) -> Result<Self, MpesaError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MpesaError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            config,
            clock,
            token: Arc::new(Mutex::new(None)),
        })
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &MpesaConfig {
        &self.config
    }

    /// Get a bearer token, from cache when still valid.
    ///
    /// # Errors
    ///
    /// Returns [`MpesaError::TokenRejected`] when Daraja refuses the
    /// credentials, or a transport error.
    pub async fn access_token(&self) -> Result<String, MpesaError> {
        let mut cached = self.token.lock().await;
        let now = self.clock.now();
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > now) {
            return Ok(token.value.clone());
        }

        let response = self
            .client
            .get(format!(
                "{}/oauth/v1/generate?grant_type=client_credentials",
                self.config.base_url
            ))
            .header(
                "Authorization",
                stk::basic_auth(&self.config.consumer_key, &self.config.consumer_secret),
            )
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Daraja refused access token request");
            return Err(MpesaError::TokenRejected(error_message(status, &body)));
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| MpesaError::ResponseParseFailed(e.to_string()))?;

        let lifetime = i64::try_from(token.expires_in)
            .map_or(MAX_TOKEN_LIFETIME_SECS, |secs| secs.min(MAX_TOKEN_LIFETIME_SECS));
        let expires_at = ChronoDuration::try_seconds((lifetime - TOKEN_EXPIRY_MARGIN_SECS).max(0))
            .and_then(|usable| now.checked_add_signed(usable))
            .ok_or_else(|| {
                MpesaError::ResponseParseFailed(format!(
                    "Unusable token lifetime: {}",
                    token.expires_in
                ))
            })?;
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at,
        });
        debug!(%expires_at, "Cached Daraja access token");
        Ok(token.access_token)
    }

    /// Build a signed STK push request for `prompt`.
    #[must_use]
    pub fn build_request(&self, prompt: &PaymentPrompt) -> StkPushRequest {
        let timestamp = stk::timestamp(self.clock.now());
        StkPushRequest {
            business_short_code: self.config.business_short_code.clone(),
            password: stk::password(
                &self.config.business_short_code,
                &self.config.passkey,
                &timestamp,
            ),
            timestamp,
            transaction_type: self.config.transaction_type.clone(),
            amount: prompt.amount.shillings(),
            party_a: prompt.phone.as_str().to_string(),
            party_b: self.config.business_short_code.clone(),
            phone_number: prompt.phone.as_str().to_string(),
            callback_url: self.config.callback_url.clone(),
            account_reference: prompt.account_reference.clone(),
            transaction_desc: prompt.description.clone(),
        }
    }

    /// Send an STK push and return Daraja's acknowledgement with the raw body.
    ///
    /// # Errors
    ///
    /// Returns [`MpesaError::ApiError`] with Daraja's `errorMessage` on a
    /// non-2xx answer, [`MpesaError::Declined`] when the answer carries a
    /// non-zero `ResponseCode`, or a transport error.
    pub async fn stk_push(
        &self,
        request: &StkPushRequest,
    ) -> Result<(StkPushResponse, serde_json::Value), MpesaError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(format!("{}/mpesa/stkpush/v1/processrequest", self.config.base_url))
            .bearer_auth(&token)
            .json(request)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let raw = response
                    .json::<serde_json::Value>()
                    .await
                    .map_err(|e| MpesaError::ResponseParseFailed(e.to_string()))?;
                let parsed: StkPushResponse = serde_json::from_value(raw.clone())
                    .map_err(|e| MpesaError::ResponseParseFailed(e.to_string()))?;
                if !parsed.is_accepted() {
                    return Err(MpesaError::Declined {
                        code: parsed.response_code,
                        description: parsed.response_description,
                    });
                }
                Ok((parsed, raw))
            }
            status => {
                if status == StatusCode::UNAUTHORIZED {
                    // Force a fresh token next time.
                    self.token.lock().await.take();
                }
                let body = response.text().await.unwrap_or_default();
                Err(MpesaError::ApiError {
                    status: status.as_u16(),
                    message: error_message(status, &body),
                })
            }
        }
    }
}

/// Daraja's `errorMessage`, or the status reason when the body has none.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error_message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string)
        })
}

#[async_trait]
impl PaymentGateway for DarajaClient {
    async fn request_payment(&self, prompt: PaymentPrompt) -> hostel_core::Result<PromptAccepted> {
        let request = self.build_request(&prompt);
        match self.stk_push(&request).await {
            Ok((response, raw)) => {
                metrics::counter!("hostel.gateway.requests", "outcome" => "accepted").increment(1);
                info!(
                    checkout_request_id = %response.checkout_request_id,
                    amount = prompt.amount.shillings(),
                    "STK push accepted"
                );
                Ok(PromptAccepted {
                    checkout_request_id: response.checkout_request_id,
                    merchant_request_id: response.merchant_request_id,
                    raw,
                })
            }
            Err(e) => {
                metrics::counter!("hostel.gateway.requests", "outcome" => "failed").increment(1);
                warn!(error = %e, "STK push failed");
                Err(e.into())
            }
        }
    }
}
