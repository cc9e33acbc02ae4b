//! Booking ledger.
//!
//! Owns the (event, slot) -> occupant mapping. All serialization between
//! concurrent callers is delegated to the store: the slot uniqueness
//! constraint and the delete-cascade transaction. No in-process lock is held
//! across a store call, so several server instances may share one store.

mod requests;

use tracing::{info, instrument, warn};

use crate::storage::{Booking, BookingDatabase, BookingInsert, Event, EventWithParticipants};
pub use crate::storage::DatabaseError;
pub use requests::{NewBooking, NewEvent, SlotClaim, StatusUpdate};

/// Errors surfaced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Malformed or out-of-range input.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The slot already has an occupant.
    #[error("slot {slot_index} of event {event_id} is already taken")]
    SlotTaken { event_id: i64, slot_index: i64 },

    /// A booking referenced an event that does not exist.
    #[error("event {0} not found")]
    EventNotFound(i64),

    /// The store could not be reached or rejected the statement.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] DatabaseError),
}

#[derive(Clone)]
pub struct BookingLedger {
    db: BookingDatabase,
}

impl BookingLedger {
    pub const fn new(db: BookingDatabase) -> Self {
        Self { db }
    }

    pub const fn db(&self) -> &BookingDatabase {
        &self.db
    }

    #[instrument(skip(self), fields(creator_id = req.creator_id))]
    pub async fn create_event(&self, req: NewEvent) -> Result<Event, LedgerError> {
        if req.slots_count <= 0 {
            return Err(LedgerError::InvalidRequest(format!(
                "slots_count must be positive, got {}",
                req.slots_count
            )));
        }

        let event = self
            .db
            .create_event(req.creator_id, req.slots_count, req.start_time)
            .await?;

        info!(
            event_id = event.id,
            slots_count = event.slots_count,
            start_time = %event.start_time,
            "Event created"
        );
        Ok(event)
    }

    /// Every event, latest start first, each with its current participants.
    pub async fn list_events(&self) -> Result<Vec<EventWithParticipants>, LedgerError> {
        Ok(self.db.list_events_with_participants().await?)
    }

    /// Remove an event and its bookings. Deleting an unknown id is a no-op.
    #[instrument(skip(self))]
    pub async fn delete_event(&self, event_id: i64) -> Result<(), LedgerError> {
        if self.db.delete_event(event_id).await? {
            info!("Event deleted");
        } else {
            info!("Event not found (already deleted)");
        }
        Ok(())
    }

    /// Claim one slot.
    ///
    /// Under a race for the same slot exactly one caller gets the booking; the
    /// rest receive [`LedgerError::SlotTaken`].
    #[instrument(skip(self, req), fields(event_id = req.event_id, slot_index = req.slot_index, user_id = req.user_id))]
    pub async fn create_booking(&self, req: NewBooking) -> Result<Booking, LedgerError> {
        if req.slot_index < 0 {
            return Err(LedgerError::InvalidRequest(format!(
                "slot_index must not be negative, got {}",
                req.slot_index
            )));
        }

        let outcome = self
            .db
            .insert_booking(
                req.event_id,
                req.slot_index,
                req.user_id,
                &req.user_name,
                &req.user_photo,
            )
            .await?;

        match outcome {
            BookingInsert::Created(booking) => {
                info!(booking_id = booking.id, "Slot booked");
                Ok(booking)
            }
            BookingInsert::SlotTaken => {
                warn!("Slot already taken");
                Err(LedgerError::SlotTaken {
                    event_id: req.event_id,
                    slot_index: req.slot_index,
                })
            }
            BookingInsert::EventMissing => Err(LedgerError::EventNotFound(req.event_id)),
            BookingInsert::SlotOutOfRange { slots_count } => {
                Err(LedgerError::InvalidRequest(format!(
                    "slot_index {} is out of range for an event with {slots_count} slots",
                    req.slot_index
                )))
            }
        }
    }

    /// Release a slot. No matching booking is not an error.
    #[instrument(skip(self))]
    pub async fn cancel_booking(&self, claim: SlotClaim) -> Result<(), LedgerError> {
        let removed = self
            .db
            .delete_booking(claim.event_id, claim.slot_index, claim.user_id)
            .await?;
        if removed {
            info!("Booking cancelled");
        } else {
            info!("No matching booking to cancel");
        }
        Ok(())
    }

    /// Set the status of every booking the user holds on the event.
    ///
    /// Returns how many bookings were updated.
    #[instrument(skip(self, update), fields(event_id = update.event_id, user_id = update.user_id, status = %update.status))]
    pub async fn set_booking_status(&self, update: StatusUpdate) -> Result<u64, LedgerError> {
        let updated = self
            .db
            .update_booking_status(update.event_id, update.user_id, &update.status)
            .await?;
        info!(updated, "Booking status updated");
        Ok(updated)
    }
}
