//! Room catalog endpoints.
//!
//! Public:
//! - GET /api/rooms - Active rooms, filterable
//! - GET /api/rooms/:id - One active room
//!
//! Admin:
//! - GET /api/admin/rooms - Every room, including inactive ones
//! - POST /api/admin/rooms - Add a room
//! - POST /api/admin/rooms/bulk - Add a numbered range of rooms
//! - PUT /api/admin/rooms/:id - Edit (or re-activate) a room
//! - DELETE /api/admin/rooms/:id - Deactivate a room

use super::parse_id;
use crate::auth::RequireAdmin;
use crate::error::AppError;
use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use hostel_core::room::{BulkRoomInput, Room, RoomFilter, RoomInput};
use serde::Serialize;

/// Response after a bulk insert.
#[derive(Debug, Serialize)]
pub struct BulkCreateResponse {
    /// Number of rooms created
    pub count: usize,
    /// The created rooms
    pub rooms: Vec<Room>,
}

/// List active rooms.
///
/// ```bash
/// curl "http://localhost:8080/api/rooms?gender=Female&block=A&min_price=5000&search=a1"
/// ```
pub async fn list_rooms(
    State(state): State<AppState>,
    Query(mut filter): Query<RoomFilter>,
) -> Result<Json<Vec<Room>>, AppError> {
    filter.include_inactive = false;
    Ok(Json(state.rooms.list(&filter).await?))
}

/// One active room.
pub async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Room>, AppError> {
    Ok(Json(state.rooms.get_active(parse_id(&id)?).await?))
}

/// Every room, active or not.
pub async fn list_all_rooms(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(mut filter): Query<RoomFilter>,
) -> Result<Json<Vec<Room>>, AppError> {
    filter.include_inactive = true;
    Ok(Json(state.rooms.list(&filter).await?))
}

/// Add a room.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/admin/rooms \
///   -H "Authorization: Bearer <admin_token>" \
///   -H "Content-Type: application/json" \
///   -d '{"block":"A","roomNumber":"A1","gender":"Male","capacity":2,"price":15000}'
/// ```
pub async fn create_room(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<RoomInput>,
) -> Result<(StatusCode, Json<Room>), AppError> {
    let room = state.rooms.create(input).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

/// Add rooms `{block}{start}` through `{block}{end}`.
pub async fn create_rooms_bulk(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<BulkRoomInput>,
) -> Result<(StatusCode, Json<BulkCreateResponse>), AppError> {
    let rooms = state.rooms.create_bulk(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(BulkCreateResponse {
            count: rooms.len(),
            rooms,
        }),
    ))
}

/// Replace a room's attributes.
pub async fn update_room(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<RoomInput>,
) -> Result<Json<Room>, AppError> {
    Ok(Json(state.rooms.update(parse_id(&id)?, input).await?))
}

/// Deactivate a room; it stays on record.
pub async fn delete_room(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Room>, AppError> {
    Ok(Json(state.rooms.deactivate(parse_id(&id)?).await?))
}
