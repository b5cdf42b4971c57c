//! M-Pesa Express (STK push) wire types and request signing.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Offset of East Africa Time, the zone Daraja expects timestamps in.
const EAT_OFFSET_HOURS: i64 = 3;

/// `YYYYMMDDHHmmss` in East Africa Time.
#[must_use]
pub fn timestamp(now: DateTime<Utc>) -> String {
    (now + Duration::hours(EAT_OFFSET_HOURS))
        .format("%Y%m%d%H%M%S")
        .to_string()
}

/// `base64(short_code + passkey + timestamp)`.
#[must_use]
pub fn password(short_code: &str, passkey: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{short_code}{passkey}{timestamp}"))
}

/// `Basic base64(key:secret)` for the OAuth endpoint.
#[must_use]
pub fn basic_auth(consumer_key: &str, consumer_secret: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{consumer_key}:{consumer_secret}"))
    )
}

/// Body of `POST /mpesa/stkpush/v1/processrequest`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushRequest {
    /// Paybill or till number
    pub business_short_code: String,
    /// See [`password`]
    pub password: String,
    /// See [`timestamp`]
    pub timestamp: String,
    /// `CustomerPayBillOnline` or `CustomerBuyGoodsOnline`
    pub transaction_type: String,
    /// Whole shillings
    pub amount: i64,
    /// Paying phone
    pub party_a: String,
    /// Receiving short code
    pub party_b: String,
    /// Phone that receives the prompt
    pub phone_number: String,
    /// Where Daraja posts the result
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    /// Shown on the prompt
    pub account_reference: String,
    /// Free text
    pub transaction_desc: String,
}

/// Synchronous acknowledgement of an STK push.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushResponse {
    /// `MerchantRequestID`
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: Option<String>,
    /// `CheckoutRequestID`, the correlation token
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    /// `"0"` when accepted
    pub response_code: String,
    /// Human-readable status
    #[serde(default)]
    pub response_description: String,
    /// Text suitable for the payer
    #[serde(default)]
    pub customer_message: String,
}

impl StkPushResponse {
    /// True when Daraja accepted the request for processing.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.response_code == "0"
    }
}

/// Daraja's error envelope.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorBody {
    pub error_message: Option<String>,
}

/// Response of `GET /oauth/v1/generate`.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    /// Seconds; Daraja sends it as a string
    #[serde(deserialize_with = "lenient_u64")]
    pub expires_in: u64,
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
