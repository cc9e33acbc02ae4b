//! Reminder sweep queries.

use super::DatabaseError;
use super::db::BookingDatabase;
use super::models::DueReminder;

impl BookingDatabase {
    /// Bookings not yet notified whose event starts in `[from_ms, until_ms]`.
    pub async fn due_reminders(
        &self,
        from_ms: i64,
        until_ms: i64,
    ) -> Result<Vec<DueReminder>, DatabaseError> {
        let due = sqlx::query_as::<_, DueReminder>(
            "SELECT b.id AS booking_id, b.event_id, b.slot_index, b.user_id, b.user_name, \
                    e.start_time \
             FROM bookings b \
             JOIN events e ON e.id = b.event_id \
             WHERE b.notification_sent = 0 AND e.start_time BETWEEN ? AND ? \
             ORDER BY e.start_time, b.event_id, b.slot_index",
        )
        .bind(from_ms)
        .bind(until_ms)
        .fetch_all(self.pool())
        .await?;

        Ok(due)
    }

    /// Flag every booking of `user_id` on `event_id` as reminded.
    pub async fn mark_notification_sent(
        &self,
        event_id: i64,
        user_id: i64,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "UPDATE bookings SET notification_sent = 1 WHERE event_id = ? AND user_id = ?",
        )
        .bind(event_id)
        .bind(user_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }
}
