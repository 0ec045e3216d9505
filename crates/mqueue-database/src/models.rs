//! Database model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A queued delivery task as persisted in the `mqueue` table.
///
/// `message_str` and `message_embed` use the empty string for "absent".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRecord {
    pub id: i64,
    pub source: String,
    pub source_id: String,
    pub channel: String,
    pub message_str: String,
    /// JSON-encoded embed document.
    pub message_embed: String,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

impl QueuedRecord {
    pub fn has_text(&self) -> bool {
        !self.message_str.is_empty()
    }

    pub fn has_embed(&self) -> bool {
        !self.message_embed.is_empty()
    }
}

/// Input for inserting a record.
///
/// Only constructible through [`NewQueuedRecord::text`] and
/// [`NewQueuedRecord::embed`], so a new record never carries both content
/// variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQueuedRecord {
    source: String,
    source_id: String,
    channel: String,
    message_str: String,
    message_embed: String,
}

impl NewQueuedRecord {
    /// A plain-text record.
    pub fn text(source: &str, source_id: &str, channel: &str, text: &str) -> Self {
        Self {
            source: source.to_string(),
            source_id: source_id.to_string(),
            channel: channel.to_string(),
            message_str: text.to_string(),
            message_embed: String::new(),
        }
    }

    /// An embed record; `encoded_embed` is the already-serialized document.
    pub fn embed(source: &str, source_id: &str, channel: &str, encoded_embed: String) -> Self {
        Self {
            source: source.to_string(),
            source_id: source_id.to_string(),
            channel: channel.to_string(),
            message_str: String::new(),
            message_embed: encoded_embed,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn message_str(&self) -> &str {
        &self.message_str
    }

    pub fn message_embed(&self) -> &str {
        &self.message_embed
    }

    /// Materialize the stored form of this record.
    pub fn into_record(self, id: i64, created_at: DateTime<Utc>) -> QueuedRecord {
        QueuedRecord {
            id,
            source: self.source,
            source_id: self.source_id,
            channel: self.channel,
            message_str: self.message_str,
            message_embed: self.message_embed,
            processed: false,
            created_at,
        }
    }
}

/// Row counts by processing state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: u64,
    pub processed: u64,
}
