//! `DarajaClient` against a mocked Daraja API.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use hostel_core::HostelError;
use hostel_core::gateway::{PaymentGateway, PaymentPrompt};
use hostel_core::phone::PhoneNumber;
use hostel_core::types::Money;
use hostel_mpesa::{DarajaClient, MpesaConfig, MpesaError};
use chrono::Duration as ChronoDuration;
use hostel_testing::test_clock;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> MpesaConfig {
    MpesaConfig {
        base_url: server.uri(),
        timeout: Duration::from_secs(2),
        ..MpesaConfig::sandbox(
            "key",
            "secret",
            "174379",
            "passkey",
            "https://hostel.example.com/api/mpesa/callback",
        )
    }
}

fn client(server: &MockServer) -> DarajaClient {
    DarajaClient::with_clock(config(server), Arc::new(test_clock())).unwrap()
}

fn prompt() -> PaymentPrompt {
    PaymentPrompt {
        phone: PhoneNumber::parse("0712345678").unwrap(),
        amount: Money::from_shillings(15_000),
        account_reference: "Hostel Room Payment".to_string(),
        description: "Payment for a hostel room".to_string(),
    }
}

async fn mount_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/oauth/v1/generate"))
        .and(query_param("grant_type", "client_credentials"))
        // base64("key:secret")
        .and(header("Authorization", "Basic a2V5OnNlY3JldA=="))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "token-123",
            "expires_in": "3599"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_stk_push_sends_signed_request_and_returns_checkout_id() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/mpesa/stkpush/v1/processrequest"))
        .and(header("Authorization", "Bearer token-123"))
        .and(body_partial_json(serde_json::json!({
            "BusinessShortCode": "174379",
            "Timestamp": "20250101030000",
            "TransactionType": "CustomerPayBillOnline",
            "Amount": 15000,
            "PartyA": "254712345678",
            "PartyB": "174379",
            "PhoneNumber": "254712345678",
            "CallBackURL": "https://hostel.example.com/api/mpesa/callback",
            "AccountReference": "Hostel Room Payment"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "MerchantRequestID": "29115-34620561-1",
            "CheckoutRequestID": "ws_CO_191220191020363925",
            "ResponseCode": "0",
            "ResponseDescription": "Success. Request accepted for processing",
            "CustomerMessage": "Success. Request accepted for processing"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    let accepted = client.request_payment(prompt()).await.unwrap();
    assert_eq!(accepted.checkout_request_id, "ws_CO_191220191020363925");
    assert_eq!(accepted.merchant_request_id.as_deref(), Some("29115-34620561-1"));
    assert_eq!(accepted.raw["CustomerMessage"], "Success. Request accepted for processing");

    // Second push reuses the cached token (token mock expects exactly one call).
    client.request_payment(prompt()).await.unwrap();
}

#[tokio::test]
async fn test_oversized_token_lifetime_is_capped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/v1/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "token-forever",
            "expires_in": "9223372036854775807"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let clock = Arc::new(test_clock());
    let client = DarajaClient::with_clock(config(&server), clock.clone()).unwrap();

    assert_eq!(client.access_token().await.unwrap(), "token-forever");
    clock.advance(ChronoDuration::hours(23));
    assert_eq!(client.access_token().await.unwrap(), "token-forever");

    // Trusted for a day at most, so this one goes back to Daraja.
    clock.advance(ChronoDuration::hours(2));
    assert_eq!(client.access_token().await.unwrap(), "token-forever");
}

#[tokio::test]
async fn test_gateway_error_message_is_passed_through() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/mpesa/stkpush/v1/processrequest"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "requestId": "1234-5678",
            "errorCode": "400.002.02",
            "errorMessage": "Bad Request - Invalid PhoneNumber"
        })))
        .mount(&server)
        .await;

    let err = client(&server).request_payment(prompt()).await.unwrap_err();
    match err {
        HostelError::Gateway(message) => assert_eq!(message, "Bad Request - Invalid PhoneNumber"),
        other => panic!("expected gateway error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_refused_credentials_surface_as_token_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/v1/generate"))
        .respond_with(ResponseTemplate::new(400).set_body_string(""))
        .mount(&server)
        .await;

    let err = client(&server).access_token().await.unwrap_err();
    assert!(matches!(err, MpesaError::TokenRejected(_)));
}

#[tokio::test]
async fn test_timeout_is_not_retried() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/mpesa/stkpush/v1/processrequest"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .expect(1)
        .mount(&server)
        .await;

    let client = DarajaClient::with_clock(
        MpesaConfig {
            timeout: Duration::from_millis(200),
            ..config(&server)
        },
        Arc::new(test_clock()),
    )
    .unwrap();

    let request = client.build_request(&prompt());
    let err = client.stk_push(&request).await.unwrap_err();
    assert!(matches!(err, MpesaError::Timeout));
}

#[tokio::test]
async fn test_non_zero_response_code_is_declined() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/mpesa/stkpush/v1/processrequest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "MerchantRequestID": "1",
            "CheckoutRequestID": "ws_CO_2",
            "ResponseCode": "1",
            "ResponseDescription": "Unable to lock subscriber"
        })))
        .mount(&server)
        .await;

    let err = client(&server).request_payment(prompt()).await.unwrap_err();
    assert!(err.to_string().contains("Unable to lock subscriber"));
}
