//! `Slotbook` Core Library
//!
//! Shared functionality for `Slotbook` components:
//! - `SQLite` pool creation and the common `DatabaseError`
//! - Millisecond timestamp conversion helpers
//! - Tracing subscriber initialisation

pub mod db;
pub mod time;
pub mod tracing_init;

pub use db::DatabaseError;
