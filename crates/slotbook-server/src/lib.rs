//! Slotbook Server Library
//!
//! Core functionality for the Slotbook server:
//! - `SQLite` storage for events and slot bookings
//! - Booking ledger enforcing one occupant per slot
//! - Reminder dispatcher notifying participants before an event starts
//! - Telegram notification channel
//! - HTTP API

pub mod api;
pub mod ledger;
pub mod notifications;
pub mod reminders;
pub mod storage;
