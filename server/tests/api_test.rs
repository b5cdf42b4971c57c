//! HTTP API integration tests.
//!
//! Drive the real router over the in-memory store and a scripted payment
//! gateway. Sessions are seeded straight into the store so most tests skip
//! password hashing; `test_register_login_logout` covers that path once.

#![allow(clippy::unwrap_used)] // Integration tests can use unwrap for setup
#![allow(clippy::too_many_lines)] // Flows read top to bottom

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::{TestRequest, TestServer};
use chrono::Duration;
use hostel_core::account::{Account, Session};
use hostel_core::environment::Clock;
use hostel_core::room::Room;
use hostel_core::store::HostelStore;
use hostel_core::types::{Gender, Money, RoomStatus};
use hostel_server::server::{AppState, build_router};
use hostel_testing::{InMemoryHostelStore, MockPaymentGateway, fixtures, test_clock};
use serde_json::{Value, json};
use std::sync::Arc;

struct Harness {
    server: TestServer,
    store: InMemoryHostelStore,
    gateway: MockPaymentGateway,
}

impl Harness {
    fn new() -> Self {
        let store = InMemoryHostelStore::new();
        let gateway = MockPaymentGateway::accepting();
        let state = AppState::new(
            Arc::new(store.clone()),
            Arc::new(gateway.clone()),
            Arc::new(test_clock()),
            Duration::days(7),
        );
        let server = TestServer::new(build_router(state)).unwrap();
        Self {
            server,
            store,
            gateway,
        }
    }

    /// Store the account and a live session for it; returns the token.
    async fn sign_in(&self, account: Account) -> String {
        let now = test_clock().now();
        let token = format!("token-{}", account.id);
        self.store.create_account(&account).await.unwrap();
        self.store
            .create_session(&Session {
                token: token.clone(),
                account_id: account.id,
                role: account.role,
                created_at: now,
                expires_at: now + Duration::days(1),
            })
            .await
            .unwrap();
        token
    }

    async fn student(&self, email: &str) -> String {
        self.sign_in(fixtures::student_account(email)).await
    }

    async fn admin(&self) -> String {
        self.sign_in(fixtures::admin_account("warden@hostel.test")).await
    }

    async fn seed_room(&self, room: Room) -> Room {
        self.store
            .insert_rooms(std::slice::from_ref(&room))
            .await
            .unwrap();
        room
    }

    /// Book `room` as the student behind `token`; returns the booking ID.
    async fn book(&self, token: &str, room: &Room, phone: &str) -> String {
        let response = bearer(self.server.post("/api/bookings"), token)
            .json(&json!({
                "roomId": room.id.to_string(),
                "fullName": "Jane Wanjiru",
                "phoneNumber": phone,
                "gender": "Female",
                "course": "BSc Computer Science"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["booking"]["id"].as_str().unwrap().to_string()
    }

    async fn status_of(&self, token: &str, booking_id: &str) -> String {
        let response =
            bearer(self.server.get(&format!("/api/bookings/{booking_id}/status")), token).await;
        response.assert_status_ok();
        response.json::<Value>()["status"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn callback(&self, body: &Value) -> Value {
        let response = self.server.post("/api/mpesa/callback").json(body).await;
        response.assert_status_ok();
        response.json()
    }
}

fn bearer(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    )
}

fn success_callback(checkout_request_id: &str, receipt: &str, amount: i64) -> Value {
    json!({"Body": {"stkCallback": {
        "MerchantRequestID": "29115-34620561-1",
        "CheckoutRequestID": checkout_request_id,
        "ResultCode": 0,
        "ResultDesc": "The service request is processed successfully.",
        "CallbackMetadata": {"Item": [
            {"Name": "Amount", "Value": amount},
            {"Name": "MpesaReceiptNumber", "Value": receipt},
            {"Name": "TransactionDate", "Value": 20_250_101_103_000_i64},
            {"Name": "PhoneNumber", "Value": 254_712_345_678_i64}
        ]}
    }}})
}

fn failed_callback(checkout_request_id: &str) -> Value {
    json!({"Body": {"stkCallback": {
        "MerchantRequestID": "29115-34620561-1",
        "CheckoutRequestID": checkout_request_id,
        "ResultCode": 1032,
        "ResultDesc": "Request cancelled by user"
    }}})
}

fn accepted() -> Value {
    json!({"ResultCode": 0, "ResultDesc": "Accepted"})
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_and_readiness() {
    let harness = Harness::new();

    let health = harness.server.get("/health").await;
    health.assert_status_ok();
    assert_eq!(health.json::<Value>()["status"], "ok");

    let ready = harness.server.get("/ready").await;
    ready.assert_status_ok();
    assert_eq!(ready.json::<Value>()["ready"], true);
}

// ============================================================================
// Booking and payment
// ============================================================================

#[tokio::test]
async fn test_booking_paid_through_mpesa_is_allocated() {
    let harness = Harness::new();
    let token = harness.student("jane@uni.test").await;
    let room = harness.seed_room(fixtures::room("A", "A1", 15_000)).await;
    let booking_id = harness.book(&token, &room, "0712345678").await;
    assert_eq!(harness.status_of(&token, &booking_id).await, "pending");

    let push = bearer(harness.server.post("/api/mpesa/stkpush"), &token)
        .json(&json!({"phone": "+254712345678", "amount": 15_000, "bookingId": booking_id}))
        .await;
    push.assert_status_ok();
    let checkout = harness.gateway.last_checkout_id().unwrap();
    assert_eq!(push.json::<Value>()["CheckoutRequestID"], checkout.as_str());

    let prompts = harness.gateway.prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].phone.as_str(), "254712345678");
    assert_eq!(prompts[0].amount, Money::from_shillings(15_000));

    let ack = harness
        .callback(&success_callback(&checkout, "NLJ7RT61SV", 15_000))
        .await;
    assert_eq!(ack, accepted());

    assert_eq!(harness.status_of(&token, &booking_id).await, "allocated");
    assert_eq!(harness.store.payment_count(), 1);
    assert_eq!(harness.store.occupancy_count(), 1);

    let balance = bearer(harness.server.get("/api/balance"), &token).await;
    balance.assert_status_ok();
    assert_eq!(balance.json::<Value>()["currentBalance"], 15_000);

    let profile = bearer(harness.server.get("/api/profile"), &token).await;
    profile.assert_status_ok();
    let overview: Value = profile.json();
    assert_eq!(overview["profile"]["phoneNumber"], "254712345678");
    assert_eq!(overview["booking"]["status"], "allocated");
    assert_eq!(overview["booking"]["roomNumber"], "A1");
}

#[tokio::test]
async fn test_redelivered_callback_records_payment_once() {
    let harness = Harness::new();
    let token = harness.student("jane@uni.test").await;
    let room = harness.seed_room(fixtures::room("A", "A1", 15_000)).await;
    let booking_id = harness.book(&token, &room, "0712345678").await;

    bearer(harness.server.post("/api/mpesa/stkpush"), &token)
        .json(&json!({"phone": "0712345678", "amount": 15_000, "bookingId": booking_id}))
        .await
        .assert_status_ok();
    let checkout = harness.gateway.last_checkout_id().unwrap();
    let callback = success_callback(&checkout, "NLJ7RT61SV", 15_000);

    assert_eq!(harness.callback(&callback).await, accepted());
    assert_eq!(harness.callback(&callback).await, accepted());

    assert_eq!(harness.store.payment_count(), 1);
    assert_eq!(harness.store.occupancy_count(), 1);
    assert_eq!(harness.store.balance_count(), 1);
}

#[tokio::test]
async fn test_failed_payment_marks_booking() {
    let harness = Harness::new();
    let token = harness.student("jane@uni.test").await;
    let room = harness.seed_room(fixtures::room("A", "A1", 15_000)).await;
    let booking_id = harness.book(&token, &room, "0712345678").await;

    bearer(harness.server.post("/api/mpesa/stkpush"), &token)
        .json(&json!({"phone": "0712345678", "amount": 15_000, "bookingId": booking_id}))
        .await
        .assert_status_ok();
    let checkout = harness.gateway.last_checkout_id().unwrap();

    assert_eq!(harness.callback(&failed_callback(&checkout)).await, accepted());
    assert_eq!(harness.status_of(&token, &booking_id).await, "payment_failed");
    assert_eq!(harness.store.payment_count(), 0);
    assert_eq!(harness.store.occupancy_count(), 0);

    // A late success for the same prompt keeps the money trail but does not
    // revive the booking.
    let late = success_callback(&checkout, "NLJ7RT61SW", 15_000);
    assert_eq!(harness.callback(&late).await, accepted());
    assert_eq!(harness.status_of(&token, &booking_id).await, "payment_failed");
    assert_eq!(harness.store.payment_count(), 1);
    assert_eq!(harness.store.occupancy_count(), 0);
    assert_eq!(harness.store.balance_count(), 0);
}

#[tokio::test]
async fn test_bad_callbacks_are_still_acknowledged() {
    let harness = Harness::new();

    let garbage = harness.server.post("/api/mpesa/callback").text("not json").await;
    garbage.assert_status_ok();
    assert_eq!(garbage.json::<Value>(), accepted());

    let unknown = success_callback("ws_CO_unknown", "NLJ7RT61SV", 100);
    assert_eq!(harness.callback(&unknown).await, accepted());

    let no_receipt = json!({"Body": {"stkCallback": {
        "CheckoutRequestID": "ws_CO_unknown",
        "ResultCode": 0,
        "ResultDesc": "The service request is processed successfully."
    }}});
    assert_eq!(harness.callback(&no_receipt).await, accepted());
    assert_eq!(harness.store.payment_count(), 0);
}

#[tokio::test]
async fn test_stk_push_validation() {
    let harness = Harness::new();
    let token = harness.student("jane@uni.test").await;
    let room = harness.seed_room(fixtures::room("A", "A1", 15_000)).await;
    let booking_id = harness.book(&token, &room, "0712345678").await;

    let missing = bearer(harness.server.post("/api/mpesa/stkpush"), &token)
        .json(&json!({"phone": "0712345678", "bookingId": booking_id}))
        .await;
    missing.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(missing.json::<Value>()["code"], "VALIDATION_ERROR");

    let bad_phone = bearer(harness.server.post("/api/mpesa/stkpush"), &token)
        .json(&json!({"phone": "12345", "amount": 100, "bookingId": booking_id}))
        .await;
    bad_phone.assert_status(StatusCode::BAD_REQUEST);

    assert!(harness.gateway.prompts().is_empty());
}

#[tokio::test]
async fn test_gateway_refusal_is_reported() {
    let harness = Harness::new();
    let token = harness.student("jane@uni.test").await;
    let room = harness.seed_room(fixtures::room("A", "A1", 15_000)).await;
    let booking_id = harness.book(&token, &room, "0712345678").await;
    harness.gateway.fail_with("Invalid Access Token");

    let push = bearer(harness.server.post("/api/mpesa/stkpush"), &token)
        .json(&json!({"phone": "0712345678", "amount": 15_000, "bookingId": booking_id}))
        .await;
    push.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = push.json();
    assert_eq!(body["code"], "GATEWAY_ERROR");
    assert!(body["message"].as_str().unwrap().contains("Invalid Access Token"));
    assert_eq!(harness.status_of(&token, &booking_id).await, "pending");
}

#[tokio::test]
async fn test_students_cannot_see_each_others_bookings() {
    let harness = Harness::new();
    let jane = harness.student("jane@uni.test").await;
    let john = harness.student("john@uni.test").await;
    let room = harness.seed_room(fixtures::room("A", "A1", 15_000)).await;
    let booking_id = harness.book(&jane, &room, "0712345678").await;

    let status = bearer(
        harness.server.get(&format!("/api/bookings/{booking_id}/status")),
        &john,
    )
    .await;
    status.assert_status(StatusCode::NOT_FOUND);

    let push = bearer(harness.server.post("/api/mpesa/stkpush"), &john)
        .json(&json!({"phone": "0722000000", "amount": 15_000, "bookingId": booking_id}))
        .await;
    push.assert_status(StatusCode::NOT_FOUND);
    assert!(harness.gateway.prompts().is_empty());
}

#[tokio::test]
async fn test_booking_requires_active_room_and_profile() {
    let harness = Harness::new();
    let token = harness.student("jane@uni.test").await;
    let mut closed = fixtures::room("C", "C1", 9_000);
    closed.status = RoomStatus::Inactive;
    let closed = harness.seed_room(closed).await;
    let open = harness.seed_room(fixtures::room("A", "A1", 15_000)).await;

    let inactive = bearer(harness.server.post("/api/bookings"), &token)
        .json(&json!({
            "roomId": closed.id.to_string(),
            "fullName": "Jane Wanjiru",
            "phoneNumber": "0712345678",
            "gender": "Female"
        }))
        .await;
    inactive.assert_status(StatusCode::CONFLICT);

    let incomplete = bearer(harness.server.post("/api/bookings"), &token)
        .json(&json!({"roomId": open.id.to_string(), "fullName": "Jane Wanjiru"}))
        .await;
    incomplete.assert_status(StatusCode::BAD_REQUEST);

    let no_room = bearer(harness.server.post("/api/bookings"), &token)
        .json(&json!({"fullName": "Jane Wanjiru", "phoneNumber": "0712345678", "gender": "Female"}))
        .await;
    no_room.assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(harness.store.booking_count(), 0);
}

// ============================================================================
// Admin
// ============================================================================

#[tokio::test]
async fn test_admin_allocation_only_applies_once() {
    let harness = Harness::new();
    let admin = harness.admin().await;
    let student = harness.student("jane@uni.test").await;
    let room = harness.seed_room(fixtures::room("A", "A1", 15_000)).await;
    let booking_id = harness.book(&student, &room, "0712345678").await;

    let pending = bearer(harness.server.get("/api/admin/bookings"), &admin).await;
    pending.assert_status_ok();
    let listed: Value = pending.json();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], booking_id.as_str());
    assert_eq!(listed[0]["studentName"], "Jane Wanjiru");
    assert_eq!(listed[0]["roomBlock"], "A");

    let allocated = bearer(harness.server.post("/api/allocations"), &admin)
        .json(&json!({"bookingId": booking_id}))
        .await;
    allocated.assert_status_ok();
    assert_eq!(allocated.json::<Value>()["booking"]["status"], "allocated");

    let again = bearer(harness.server.post("/api/allocations"), &admin)
        .json(&json!({"bookingId": booking_id}))
        .await;
    again.assert_status(StatusCode::CONFLICT);
    assert_eq!(again.json::<Value>()["code"], "INVALID_STATE");

    assert_eq!(harness.store.occupancy_count(), 1);
    assert_eq!(harness.store.payment_count(), 0);

    let still_pending = bearer(harness.server.get("/api/admin/bookings"), &admin).await;
    assert!(still_pending.json::<Value>().as_array().unwrap().is_empty());
    let done = bearer(
        harness
            .server
            .get("/api/admin/bookings")
            .add_query_param("status", "allocated"),
        &admin,
    )
    .await;
    assert_eq!(done.json::<Value>().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_rejected_booking_cannot_be_paid() {
    let harness = Harness::new();
    let admin = harness.admin().await;
    let student = harness.student("jane@uni.test").await;
    let room = harness.seed_room(fixtures::room("A", "A1", 15_000)).await;
    let booking_id = harness.book(&student, &room, "0712345678").await;

    let rejected = bearer(
        harness
            .server
            .post(&format!("/api/admin/bookings/{booking_id}/reject")),
        &admin,
    )
    .json(&json!({"reason": "Block A is reserved for first years"}))
    .await;
    rejected.assert_status_ok();
    assert_eq!(rejected.json::<Value>()["booking"]["status"], "rejected");

    let push = bearer(harness.server.post("/api/mpesa/stkpush"), &student)
        .json(&json!({"phone": "0712345678", "amount": 15_000, "bookingId": booking_id}))
        .await;
    push.assert_status(StatusCode::CONFLICT);
    assert!(harness.gateway.prompts().is_empty());
}

#[tokio::test]
async fn test_admin_routes_require_admin_session() {
    let harness = Harness::new();
    let student = harness.student("jane@uni.test").await;

    harness
        .server
        .get("/api/admin/bookings")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    bearer(harness.server.get("/api/admin/bookings"), &student)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    bearer(harness.server.post("/api/allocations"), &student)
        .json(&json!({"bookingId": "00000000-0000-0000-0000-000000000000"}))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    bearer(harness.server.get("/api/bookings/x/status"), "no-such-token")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_room_management_and_filters() {
    let harness = Harness::new();
    let admin = harness.admin().await;

    let created = bearer(harness.server.post("/api/admin/rooms"), &admin)
        .json(&json!({
            "block": "B",
            "roomNumber": "B1",
            "gender": "Female",
            "capacity": 3,
            "price": 9_000
        }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let b1_id = created.json::<Value>()["id"].as_str().unwrap().to_string();

    let bulk = bearer(harness.server.post("/api/admin/rooms/bulk"), &admin)
        .json(&json!({
            "block": "A",
            "roomNumberStart": 1,
            "roomNumberEnd": 3,
            "gender": "Male",
            "capacity": 2,
            "price": 15_000
        }))
        .await;
    bulk.assert_status(StatusCode::CREATED);
    assert_eq!(bulk.json::<Value>()["count"], 3);

    let duplicate = bearer(harness.server.post("/api/admin/rooms/bulk"), &admin)
        .json(&json!({
            "block": "A",
            "roomNumberStart": 3,
            "roomNumberEnd": 4,
            "gender": "Male",
            "capacity": 2,
            "price": 15_000
        }))
        .await;
    duplicate.assert_status(StatusCode::CONFLICT);
    assert_eq!(harness.store.room_count(), 4);

    bearer(harness.server.delete(&format!("/api/admin/rooms/{b1_id}")), &admin)
        .await
        .assert_status_ok();

    let public: Value = harness.server.get("/api/rooms").await.json();
    assert_eq!(public.as_array().unwrap().len(), 3);
    harness
        .server
        .get(&format!("/api/rooms/{b1_id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let all: Value = bearer(harness.server.get("/api/admin/rooms"), &admin)
        .await
        .json();
    assert_eq!(all.as_array().unwrap().len(), 4);

    let reopened = bearer(harness.server.put(&format!("/api/admin/rooms/{b1_id}")), &admin)
        .json(&json!({
            "block": "B",
            "roomNumber": "B1",
            "gender": "Female",
            "capacity": 3,
            "price": 8_500,
            "status": "active"
        }))
        .await;
    reopened.assert_status_ok();

    let female: Value = harness
        .server
        .get("/api/rooms")
        .add_query_param("gender", "Female")
        .await
        .json();
    assert_eq!(female.as_array().unwrap().len(), 1);
    assert_eq!(female[0]["price"], 8_500);

    let cheap: Value = harness
        .server
        .get("/api/rooms")
        .add_query_param("max_price", 10_000)
        .await
        .json();
    assert_eq!(cheap.as_array().unwrap().len(), 1);

    let searched: Value = harness
        .server
        .get("/api/rooms")
        .add_query_param("search", "a2")
        .await
        .json();
    assert_eq!(searched.as_array().unwrap().len(), 1);
    assert_eq!(searched[0]["roomNumber"], "A2");

    harness
        .server
        .get("/api/rooms/not-a-uuid")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// ============================================================================
// Accounts and profile
// ============================================================================

#[tokio::test]
async fn test_profile_is_empty_before_first_booking() {
    let harness = Harness::new();
    let token = harness.student("jane@uni.test").await;

    let profile = bearer(harness.server.get("/api/profile"), &token).await;
    profile.assert_status_ok();
    assert_eq!(
        profile.json::<Value>(),
        json!({"profile": null, "booking": null})
    );

    bearer(harness.server.get("/api/balance"), &token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    bearer(harness.server.put("/api/profile"), &token)
        .json(&json!({"fullName": "Jane", "phoneNumber": "0712345678", "gender": "Female"}))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_update_normalizes_phone() {
    let harness = Harness::new();
    let token = harness.student("jane@uni.test").await;
    let room = harness.seed_room(fixtures::room("A", "A1", 15_000)).await;
    harness.book(&token, &room, "0712345678").await;

    let updated = bearer(harness.server.put("/api/profile"), &token)
        .json(&json!({
            "fullName": "Jane W. Wanjiru",
            "phoneNumber": "+254 733 000 111",
            "gender": Gender::Female,
            "homeCounty": "Kiambu"
        }))
        .await;
    updated.assert_status_ok();
    let body: Value = updated.json();
    assert_eq!(body["fullName"], "Jane W. Wanjiru");
    assert_eq!(body["phoneNumber"], "254733000111");
    assert_eq!(body["homeCounty"], "Kiambu");
}

#[tokio::test]
async fn test_register_login_logout() {
    let harness = Harness::new();
    let credentials = json!({"email": "Jane@Uni.test", "password": "password123"});

    let registered = harness
        .server
        .post("/api/auth/register")
        .json(&credentials)
        .await;
    registered.assert_status(StatusCode::CREATED);
    assert_eq!(registered.json::<Value>()["email"], "jane@uni.test");

    harness
        .server
        .post("/api/auth/register")
        .json(&credentials)
        .await
        .assert_status(StatusCode::CONFLICT);

    harness
        .server
        .post("/api/auth/admin-login")
        .json(&credentials)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let login = harness.server.post("/api/auth/login").json(&credentials).await;
    login.assert_status_ok();
    let body: Value = login.json();
    assert_eq!(body["role"], "student");
    let token = body["token"].as_str().unwrap().to_string();

    bearer(harness.server.get("/api/profile"), &token)
        .await
        .assert_status_ok();
    bearer(harness.server.post("/api/auth/logout"), &token)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    bearer(harness.server.get("/api/profile"), &token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(harness.store.session_count(), 0);
}
