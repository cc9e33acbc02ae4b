//! Booking queries.

use super::DatabaseError;
use super::db::BookingDatabase;
use super::models::Booking;

/// Outcome of an attempt to claim a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingInsert {
    Created(Booking),
    /// Another booking already holds `(event_id, slot_index)`.
    SlotTaken,
    EventMissing,
    /// `slot_index` is negative or not below the event's `slots_count`.
    SlotOutOfRange { slots_count: i64 },
}

impl BookingDatabase {
    /// Claim a slot with a single conditional insert.
    ///
    /// The row is only produced when the event exists and the index is in
    /// range; the `UNIQUE (event_id, slot_index)` constraint decides between
    /// concurrent claims, so exactly one of them commits.
    pub async fn insert_booking(
        &self,
        event_id: i64,
        slot_index: i64,
        user_id: i64,
        user_name: &str,
        user_photo: &str,
    ) -> Result<BookingInsert, DatabaseError> {
        let inserted = sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings (event_id, slot_index, user_id, user_name, user_photo) \
             SELECT id, ?, ?, ?, ? FROM events WHERE id = ? AND ? >= 0 AND ? < slots_count \
             RETURNING *",
        )
        .bind(slot_index)
        .bind(user_id)
        .bind(user_name)
        .bind(user_photo)
        .bind(event_id)
        .bind(slot_index)
        .bind(slot_index)
        .fetch_optional(self.pool())
        .await;

        match inserted {
            Ok(Some(booking)) => Ok(BookingInsert::Created(booking)),
            Ok(None) => match self.get_event(event_id).await? {
                Some(event) => Ok(BookingInsert::SlotOutOfRange {
                    slots_count: event.slots_count,
                }),
                None => Ok(BookingInsert::EventMissing),
            },
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Ok(BookingInsert::SlotTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get a booking by ID.
    pub async fn get_booking(&self, id: i64) -> Result<Option<Booking>, DatabaseError> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(booking)
    }

    /// Get the booking occupying a slot, if any.
    pub async fn get_slot_booking(
        &self,
        event_id: i64,
        slot_index: i64,
    ) -> Result<Option<Booking>, DatabaseError> {
        let booking = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE event_id = ? AND slot_index = ?",
        )
        .bind(event_id)
        .bind(slot_index)
        .fetch_optional(self.pool())
        .await?;

        Ok(booking)
    }

    /// List the bookings of an event ordered by slot.
    pub async fn list_event_bookings(&self, event_id: i64) -> Result<Vec<Booking>, DatabaseError> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE event_id = ? ORDER BY slot_index",
        )
        .bind(event_id)
        .fetch_all(self.pool())
        .await?;

        Ok(bookings)
    }

    /// Delete the booking matching all three fields.
    ///
    /// Returns `true` if a row was deleted.
    pub async fn delete_booking(
        &self,
        event_id: i64,
        slot_index: i64,
        user_id: i64,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "DELETE FROM bookings WHERE event_id = ? AND slot_index = ? AND user_id = ?",
        )
        .bind(event_id)
        .bind(slot_index)
        .bind(user_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set `status` on every booking `user_id` holds for `event_id`.
    pub async fn update_booking_status(
        &self,
        event_id: i64,
        user_id: i64,
        status: &str,
    ) -> Result<u64, DatabaseError> {
        let result =
            sqlx::query("UPDATE bookings SET status = ? WHERE event_id = ? AND user_id = ?")
                .bind(status)
                .bind(event_id)
                .bind(user_id)
                .execute(self.pool())
                .await?;

        Ok(result.rows_affected())
    }
}
