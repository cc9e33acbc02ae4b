//! `SQLite` storage for the Slotbook server.
//!
//! Owns the `events` and `bookings` tables. Every ledger operation and every
//! reminder sweep reads and writes through here; nothing is cached in process.

mod db;
mod models;
mod queries_bookings;
mod queries_events;
mod queries_reminders;


pub use db::BookingDatabase;
pub use models::*;
pub use queries_bookings::BookingInsert;
pub use slotbook_core::db::DatabaseError;
