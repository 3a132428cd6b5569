//! Error taxonomy for bag conversion.
//!
//! The pipeline distinguishes three severities: per-record failures
//! ([`ConvertError::MalformedRecord`]) are skipped with a warning, per-topic
//! failures ([`ConvertError::MissingField`], [`ConvertError::UnknownTopic`])
//! abort that sensor's conversion without touching its siblings, and I/O
//! failures abort the whole bag.

use std::path::PathBuf;

use thiserror::Error;

use crate::bag::RawRecord;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// A topic was requested that the bag does not contain. Callers are
    /// expected to probe `BagReader::has_topic` first, so hitting this is a
    /// contract violation rather than a recoverable condition.
    #[error("topic not present in bag: {0}")]
    UnknownTopic(String),

    /// A single record's payload does not match its declared geometry. The
    /// record is dropped; the rest of the topic keeps converting.
    #[error("malformed record on {topic} at {timestamp}ns: {reason}")]
    MalformedRecord {
        topic: String,
        timestamp: u64,
        reason: String,
    },

    /// A field required for decoding is absent from the point schema. No
    /// valid decoding of the topic exists, so its conversion is abandoned.
    #[error("required field `{0}` missing from point schema")]
    MissingField(String),

    /// Synchronization was requested but no stream has any frames to anchor
    /// the alignment on.
    #[error("no non-empty stream to anchor synchronization on")]
    AllStreamsEmpty,

    #[error("failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    pub fn malformed(record: &RawRecord<'_>, reason: impl Into<String>) -> Self {
        ConvertError::MalformedRecord {
            topic: record.topic.to_string(),
            timestamp: record.time,
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }
}
