//! Data models for Slotbook storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotbook_core::time::from_millis;

/// Raw `events` row; `start_time` is Unix milliseconds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct EventRow {
    pub id: i64,
    pub creator_id: i64,
    pub slots_count: i64,
    pub start_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub creator_id: i64,
    pub slots_count: i64,
    pub start_time: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            creator_id: row.creator_id,
            slots_count: row.slots_count,
            start_time: from_millis(row.start_time),
        }
    }
}

/// A user's claim on one slot of one event.
///
/// `user_name` and `user_photo` are a snapshot taken at booking time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub id: i64,
    pub event_id: i64,
    pub slot_index: i64,
    pub user_id: i64,
    pub user_name: String,
    pub user_photo: String,
    pub status: String,
    pub notification_sent: bool,
}

/// An event together with every live booking made against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWithParticipants {
    #[serde(flatten)]
    pub event: Event,
    /// Ordered by slot index; empty (never absent) when nobody booked.
    pub participants: Vec<Booking>,
}

/// A booking whose event starts inside the reminder lookahead window.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DueReminder {
    pub booking_id: i64,
    pub event_id: i64,
    pub slot_index: i64,
    pub user_id: i64,
    pub user_name: String,
    #[sqlx(rename = "start_time")]
    pub start_time_ms: i64,
}

impl DueReminder {
    pub fn start_time(&self) -> DateTime<Utc> {
        from_millis(self.start_time_ms)
    }
}
