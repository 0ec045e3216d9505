//! The delivery API seam consumed by the workers.

use crate::Embed;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Numeric destination channel handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u64);

impl FromStr for ChannelId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(ChannelId)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a failed send should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Retrying the same request will not help.
    Permanent,
    /// Expected to resolve with a retry.
    Transient,
}

/// A failed call to the delivery API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("rate limited")]
    RateLimited,

    /// Non-success HTTP response. `code` is the API's own error code when the
    /// body carried one (0 and absent both mean "none").
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl DeliveryError {
    /// Client-side rejections (4xx other than 429) and any nonzero API error
    /// code are permanent; everything else is retried.
    ///
    /// 429 only asks the caller to slow down, so it is retried at the fixed
    /// interval instead of being reported to the source.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Http { status, code, .. } => {
                let client_rejected = (400..500).contains(status) && *status != 429;
                let api_code = code.is_some_and(|c| c != 0);
                if client_rejected || api_code {
                    FailureKind::Permanent
                } else {
                    FailureKind::Transient
                }
            }
            Self::Network(_) | Self::Timeout | Self::RateLimited | Self::InvalidResponse(_) => {
                FailureKind::Transient
            }
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.kind() == FailureKind::Permanent
    }
}

/// Sends messages to destination channels.
#[async_trait]
pub trait DeliveryApi: Send + Sync {
    async fn send_text(&self, channel: ChannelId, text: &str) -> Result<(), DeliveryError>;

    async fn send_embed(&self, channel: ChannelId, embed: &Embed) -> Result<(), DeliveryError>;
}
