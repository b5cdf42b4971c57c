//! Room catalog records, admin input and student-facing filters.

use crate::error::{HostelError, Result};
use crate::types::{Gender, Money, RoomId, RoomStatus};
use serde::{Deserialize, Serialize};

/// A bookable room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Room ID
    pub id: RoomId,
    /// Block label, e.g. "A"
    pub block: String,
    /// Room number, unique within its block
    pub room_number: String,
    /// Which students may be placed here
    pub gender: Gender,
    /// Number of beds
    pub capacity: u32,
    /// Monthly price
    pub price: Money,
    /// Optional photo URLs
    #[serde(default)]
    pub photo_urls: Vec<String>,
    /// Active rooms are listed to students
    pub status: RoomStatus,
}

impl Room {
    /// True when the room is listed and bookable.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == RoomStatus::Active
    }
}

/// Admin input for creating or editing a room.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInput {
    /// Block label
    pub block: String,
    /// Room number
    pub room_number: String,
    /// Gender restriction
    pub gender: Gender,
    /// Number of beds
    pub capacity: u32,
    /// Monthly price
    pub price: Money,
    /// Photo URLs
    #[serde(default)]
    pub photo_urls: Vec<String>,
    /// Defaults to active
    #[serde(default)]
    pub status: RoomStatus,
}

impl RoomInput {
    /// Validate and build a room with the given ID.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::Validation`] for a blank block or number, a
    /// zero capacity, or a negative price.
    pub fn into_room(self, id: RoomId) -> Result<Room> {
        let block = self.block.trim().to_string();
        let room_number = self.room_number.trim().to_string();
        if block.is_empty() {
            return Err(HostelError::validation("Block is required"));
        }
        if room_number.is_empty() {
            return Err(HostelError::validation("Room number is required"));
        }
        if self.capacity == 0 {
            return Err(HostelError::validation("Capacity must be at least 1"));
        }
        if self.price.is_negative() {
            return Err(HostelError::validation("Price cannot be negative"));
        }
        Ok(Room {
            id,
            block,
            room_number,
            gender: self.gender,
            capacity: self.capacity,
            price: self.price,
            photo_urls: self.photo_urls,
            status: self.status,
        })
    }
}

/// Admin input for adding a contiguous range of rooms in one block.
///
/// Room numbers are generated as `{block}{n}` for every `n` in
/// `room_number_start..=room_number_end`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRoomInput {
    /// Block label
    pub block: String,
    /// First number in the range
    pub room_number_start: u32,
    /// Last number in the range (inclusive)
    pub room_number_end: u32,
    /// Gender restriction shared by every room
    pub gender: Gender,
    /// Beds per room
    pub capacity: u32,
    /// Monthly price per room
    pub price: Money,
    /// Defaults to active
    #[serde(default)]
    pub status: RoomStatus,
}

/// Upper bound on rooms created by a single bulk request.
pub const MAX_BULK_ROOMS: u32 = 500;

impl BulkRoomInput {
    /// Expand into validated rooms with fresh IDs.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::Validation`] when the range is reversed, too
    /// large, or any generated room fails [`RoomInput::into_room`].
    pub fn into_rooms(self) -> Result<Vec<Room>> {
        if self.room_number_end < self.room_number_start {
            return Err(HostelError::validation(
                "Room number end cannot be less than the start",
            ));
        }
        if self.room_number_end - self.room_number_start >= MAX_BULK_ROOMS {
            return Err(HostelError::validation(format!(
                "At most {MAX_BULK_ROOMS} rooms can be added at once"
            )));
        }
        let block = self.block.trim().to_string();
        (self.room_number_start..=self.room_number_end)
            .map(|n| {
                RoomInput {
                    block: block.clone(),
                    room_number: format!("{block}{n}"),
                    gender: self.gender,
                    capacity: self.capacity,
                    price: self.price,
                    photo_urls: Vec::new(),
                    status: self.status,
                }
                .into_room(RoomId::new())
            })
            .collect()
    }
}

/// Student-facing room filters. Every field is optional; unset fields match
/// everything.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomFilter {
    /// Only rooms for this gender
    pub gender: Option<Gender>,
    /// Only rooms in this block
    pub block: Option<String>,
    /// Only rooms with exactly this many beds
    pub capacity: Option<u32>,
    /// Minimum monthly price
    #[serde(alias = "min_price")]
    pub min_price: Option<i64>,
    /// Maximum monthly price
    #[serde(alias = "max_price")]
    pub max_price: Option<i64>,
    /// Case-insensitive substring of room number or block
    pub search: Option<String>,
    /// Include deactivated rooms (admin listing)
    #[serde(default, alias = "include_inactive")]
    pub include_inactive: bool,
}

impl RoomFilter {
    /// Filter used for the public listing.
    #[must_use]
    pub fn active_only() -> Self {
        Self::default()
    }

    /// True when `room` passes every set criterion.
    #[must_use]
    pub fn matches(&self, room: &Room) -> bool {
        if !self.include_inactive && !room.is_active() {
            return false;
        }
        if self.gender.is_some_and(|g| g != room.gender) {
            return false;
        }
        if self
            .block
            .as_deref()
            .is_some_and(|b| !b.eq_ignore_ascii_case(&room.block))
        {
            return false;
        }
        if self.capacity.is_some_and(|c| c != room.capacity) {
            return false;
        }
        if self.min_price.is_some_and(|p| room.price.shillings() < p) {
            return false;
        }
        if self.max_price.is_some_and(|p| room.price.shillings() > p) {
            return false;
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            if !room.room_number.to_lowercase().contains(&term)
                && !room.block.to_lowercase().contains(&term)
            {
                return false;
            }
        }
        true
    }
}
