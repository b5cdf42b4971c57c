//! HTTP API handlers, grouped by resource.

pub mod admin;
pub mod bookings;
pub mod payments;
pub mod profile;
pub mod rooms;

use crate::error::AppError;
use hostel_core::HostelError;
use std::str::FromStr;

/// Parse a path or body identifier, answering 400 when malformed.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, AppError>
where
    T: FromStr<Err = HostelError>,
{
    raw.trim().parse::<T>().map_err(AppError::from)
}
