//! HTTP route table.

use crate::api::{admin, bookings, payments, profile, rooms};
use crate::auth::handlers as auth;
use crate::server::health::{health_check, readiness_check};
use crate::server::state::AppState;
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post, put},
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

/// Build the application router.
///
/// # Routes
///
/// ## Health (no auth)
/// - `GET /health` - Liveness
/// - `GET /ready` - Readiness (database reachable)
///
/// ## Accounts
/// - `POST /api/auth/register`
/// - `POST /api/auth/login`
/// - `POST /api/auth/admin-login`
/// - `POST /api/auth/logout`
///
/// ## Students (session required unless noted)
/// - `GET /api/rooms`, `GET /api/rooms/:id` (public)
/// - `POST /api/bookings`
/// - `GET /api/bookings/:id/status`
/// - `GET|PUT /api/profile`
/// - `GET /api/balance`
/// - `POST /api/mpesa/stkpush`
/// - `POST /api/mpesa/callback` (public, called by Daraja)
///
/// ## Admin
/// - `POST /api/allocations`
/// - `GET|POST /api/admin/rooms`, `POST /api/admin/rooms/bulk`
/// - `PUT|DELETE /api/admin/rooms/:id`
/// - `GET /api/admin/bookings`
/// - `POST /api/admin/bookings/:id/reject`
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/admin-login", post(auth::admin_login))
        .route("/logout", post(auth::logout));

    let admin_routes = Router::new()
        .route("/rooms", get(rooms::list_all_rooms).post(rooms::create_room))
        .route("/rooms/bulk", post(rooms::create_rooms_bulk))
        .route(
            "/rooms/:id",
            put(rooms::update_room).delete(rooms::delete_room),
        )
        .route("/bookings", get(admin::list_bookings))
        .route("/bookings/:id/reject", post(admin::reject));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .route("/rooms", get(rooms::list_rooms))
        .route("/rooms/:id", get(rooms::get_room))
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/:id/status", get(bookings::booking_status))
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/balance", get(profile::get_balance))
        .route("/mpesa/stkpush", post(payments::stk_push))
        .route("/mpesa/callback", post(payments::callback))
        .route("/allocations", post(admin::allocate))
        .nest("/admin", admin_routes);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors),
        )
        .with_state(state)
}
