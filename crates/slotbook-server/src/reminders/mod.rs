//! Periodic reminder sweep.
//!
//! Delivery is at-least-once until the window closes: a booking is retried on
//! every cycle until a send succeeds or its event starts.

mod dispatcher;

pub use dispatcher::{CycleReport, ReminderDispatcher, reminder_text};

use std::time::Duration;

/// Timing knobs for the reminder sweep.
#[derive(Debug, Clone, Copy)]
pub struct ReminderConfig {
    /// Time between sweeps.
    pub interval: Duration,
    /// How far ahead of now an event start makes its bookings due.
    pub lookahead: Duration,
    /// Upper bound for a single send.
    pub send_timeout: Duration,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            lookahead: Duration::from_secs(15 * 60),
            send_timeout: Duration::from_secs(10),
        }
    }
}
