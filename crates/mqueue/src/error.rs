//! Queue error types.

use crate::DeliveryError;
use thiserror::Error;

/// Queue error type.
#[derive(Error, Debug)]
pub enum MqueueError {
    /// The persistence backend could not be reached or rejected the write
    #[error("Queue store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored record cannot be delivered as written
    #[error("Malformed record: {0}")]
    Data(#[from] DataError),

    /// The delivery API reported a failure
    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    /// start() or register_source() while the engine is running
    #[error("Message queue already started")]
    AlreadyStarted,

    /// Engine settings that the timers cannot run with
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl From<mqueue_database::DatabaseError> for MqueueError {
    fn from(e: mqueue_database::DatabaseError) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

/// Result type alias using MqueueError.
pub type MqueueResult<T> = Result<T, MqueueError>;

/// A record that can never be delivered. Terminal, never reported to the
/// owning source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("invalid channel {0:?}")]
    InvalidChannel(String),

    #[error("failed decoding message embed: {0}")]
    EmbedDecode(String),

    #[error("both message_str and message_embed are empty")]
    EmptyContent,
}
