//! Event queries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use slotbook_core::time::to_millis;

use super::DatabaseError;
use super::db::BookingDatabase;
use super::models::{Booking, Event, EventRow, EventWithParticipants};

impl BookingDatabase {
    /// Insert a new event and return it with its generated id.
    pub async fn create_event(
        &self,
        creator_id: i64,
        slots_count: i64,
        start_time: DateTime<Utc>,
    ) -> Result<Event, DatabaseError> {
        let row = sqlx::query_as::<_, EventRow>(
            "INSERT INTO events (creator_id, slots_count, start_time) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(creator_id)
        .bind(slots_count)
        .bind(to_millis(start_time))
        .fetch_one(self.pool())
        .await?;

        Ok(row.into())
    }

    /// Get an event by ID.
    pub async fn get_event(&self, id: i64) -> Result<Option<Event>, DatabaseError> {
        let row = sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(Event::from))
    }

    /// List every event, latest start first, each with its participants.
    ///
    /// Two statements instead of a grouped join: the aggregation happens here
    /// so an event without bookings always carries an empty `participants`.
    pub async fn list_events_with_participants(
        &self,
    ) -> Result<Vec<EventWithParticipants>, DatabaseError> {
        let events = sqlx::query_as::<_, EventRow>(
            "SELECT * FROM events ORDER BY start_time DESC, id DESC",
        )
        .fetch_all(self.pool())
        .await?;

        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings ORDER BY event_id, slot_index",
        )
        .fetch_all(self.pool())
        .await?;

        let mut by_event: HashMap<i64, Vec<Booking>> = HashMap::new();
        for booking in bookings {
            by_event.entry(booking.event_id).or_default().push(booking);
        }

        Ok(events
            .into_iter()
            .map(|row| {
                let participants = by_event.remove(&row.id).unwrap_or_default();
                EventWithParticipants {
                    event: row.into(),
                    participants,
                }
            })
            .collect())
    }

    /// Delete an event and all of its bookings in one transaction.
    ///
    /// Returns `true` if the event existed.
    pub async fn delete_event(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM bookings WHERE event_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
