//! Outbound reminder delivery.
//!
//! The dispatcher only needs "send this text to this user"; [`Notifier`] is
//! that capability and [`TelegramClient`] is the production implementation.

pub mod telegram;

use std::future::Future;

pub use telegram::TelegramClient;

/// Errors that can occur while delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// The channel is misconfigured (e.g. empty bot token).
    #[error("notification channel configuration error: {0}")]
    Config(String),

    /// The HTTP request could not be completed.
    #[error("notification request error: {0}")]
    Request(String),

    /// The channel answered with a non-success status.
    #[error("notification API error (status {status}): {body}")]
    ApiError {
        /// HTTP status code returned by the API.
        status: u16,
        /// Response body or API description.
        body: String,
    },

    /// The send did not complete within the per-send timeout.
    #[error("notification send timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// A channel able to deliver a text message to a user.
pub trait Notifier: Send + Sync {
    fn send_message(
        &self,
        user_id: i64,
        text: &str,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}
