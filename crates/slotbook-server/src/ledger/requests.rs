//! Inputs accepted by the booking ledger.
//!
//! These are deserialized straight from request bodies, so field names match
//! the JSON contract.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub creator_id: i64,
    pub slots_count: i64,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub event_id: i64,
    pub slot_index: i64,
    pub user_id: i64,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_photo: String,
}

/// Identifies a booking to cancel; all three fields must match.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SlotClaim {
    pub event_id: i64,
    pub slot_index: i64,
    pub user_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub event_id: i64,
    pub user_id: i64,
    pub status: String,
}
