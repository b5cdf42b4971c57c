//! Inbound STK callback envelope.
//!
//! Daraja posts the result of an STK push as
//!
//! ```json
//! { "Body": { "stkCallback": {
//!     "MerchantRequestID": "29115-34620561-1",
//!     "CheckoutRequestID": "ws_CO_191220191020363925",
//!     "ResultCode": 0,
//!     "ResultDesc": "The service request is processed successfully.",
//!     "CallbackMetadata": { "Item": [
//!         { "Name": "Amount", "Value": 1.00 },
//!         { "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" },
//!         { "Name": "TransactionDate", "Value": 20191219102115 },
//!         { "Name": "PhoneNumber", "Value": 254708374149 }
//!     ]}
//! }}}
//! ```
//!
//! `CallbackMetadata` is absent on failure.

use crate::error::MpesaError;
use hostel_core::booking::PaymentReceipt;
use hostel_core::gateway::PaymentNotification;
use hostel_core::types::Money;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level callback body.
#[derive(Clone, Debug, Deserialize)]
pub struct CallbackEnvelope {
    /// `Body`
    #[serde(rename = "Body")]
    pub body: CallbackBody,
}

/// `Body`
#[derive(Clone, Debug, Deserialize)]
pub struct CallbackBody {
    /// `stkCallback`
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

/// `Body.stkCallback`
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkCallback {
    /// `MerchantRequestID`
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: Option<String>,
    /// `CheckoutRequestID`
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    /// `0` on success
    pub result_code: i64,
    /// Human-readable outcome
    #[serde(default)]
    pub result_desc: String,
    /// Present on success
    pub callback_metadata: Option<CallbackMetadata>,
}

/// `CallbackMetadata`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallbackMetadata {
    /// `Item`
    #[serde(rename = "Item", default)]
    pub items: Vec<MetadataItem>,
}

/// One `{Name, Value}` pair.
#[derive(Clone, Debug, Deserialize)]
pub struct MetadataItem {
    /// `Name`
    #[serde(rename = "Name")]
    pub name: String,
    /// `Value`; Daraja omits it for some names (e.g. `Balance`)
    #[serde(rename = "Value", default)]
    pub value: Option<Value>,
}

impl CallbackMetadata {
    fn get(&self, name: &str) -> Option<&Value> {
        self.items
            .iter()
            .find(|item| item.name == name)
            .and_then(|item| item.value.as_ref())
    }

    fn text(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    #[allow(clippy::cast_possible_truncation)] // Amounts are far below i64::MAX
    fn amount(&self) -> Option<Money> {
        let value = self.get("Amount")?;
        let shillings = match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.round() as i64))?,
            Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64)?,
            _ => return None,
        };
        Some(Money::from_shillings(shillings))
    }
}

impl CallbackEnvelope {
    /// Parse a raw webhook body.
    ///
    /// # Errors
    ///
    /// Returns [`MpesaError::MalformedCallback`] when the body is not a
    /// callback envelope.
    pub fn parse(body: &[u8]) -> Result<Self, MpesaError> {
        serde_json::from_slice(body).map_err(|e| MpesaError::MalformedCallback(e.to_string()))
    }

    /// Convert into the gateway-neutral notification.
    ///
    /// # Errors
    ///
    /// Returns [`MpesaError::MalformedCallback`] when a success carries no
    /// receipt number or amount.
    pub fn into_notification(self) -> Result<PaymentNotification, MpesaError> {
        let callback = self.body.stk_callback;
        let receipt = if callback.result_code == PaymentNotification::SUCCESS {
            let metadata = callback.callback_metadata.unwrap_or_default();
            let mpesa_receipt = metadata.text("MpesaReceiptNumber").ok_or_else(|| {
                MpesaError::MalformedCallback("MpesaReceiptNumber missing".to_string())
            })?;
            let amount = metadata
                .amount()
                .ok_or_else(|| MpesaError::MalformedCallback("Amount missing".to_string()))?;
            Some(PaymentReceipt {
                mpesa_receipt,
                amount,
                phone_number: metadata.text("PhoneNumber").unwrap_or_default(),
                merchant_request_id: metadata
                    .text("MerchantRequestID")
                    .or_else(|| callback.merchant_request_id.clone()),
            })
        } else {
            None
        };

        Ok(PaymentNotification {
            checkout_request_id: callback.checkout_request_id,
            merchant_request_id: callback.merchant_request_id,
            result_code: callback.result_code,
            result_desc: callback.result_desc,
            receipt,
        })
    }
}

/// The acknowledgement Daraja expects for every callback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackAck {
    /// Always `0`
    pub result_code: i64,
    /// Always `"Accepted"`
    pub result_desc: String,
}

impl Default for CallbackAck {
    fn default() -> Self {
        Self {
            result_code: 0,
            result_desc: "Accepted".to_string(),
        }
    }
}
