//! # deck-logs
//!
//! Container log classification and stream processing for LogDeck.
//!
//! This crate provides:
//!
//! - [`classify`] - Turns one raw line into a [`LogEntry`] (timestamp, level, message)
//! - [`LineDecoder`] - Reassembles lines from engine frames, per stream
//! - [`collect_snapshot`] - Reads a bounded log range into a [`LogBatch`]
//! - [`ndjson_entries`] - Encodes a live frame stream as NDJSON
//! - [`relay_follow`] - Forwards a live source to a [`ChunkSink`]
//! - [`LogOptions`] - What to read, parsed from query parameters
//!
//! ## Example
//!
//! ```rust
//! use deck_logs::{classify, LogLevel, StreamKind};
//!
//! let entry = classify("2023-10-05T10:00:00Z disk ERROR", StreamKind::Stderr);
//! assert_eq!(entry.level, LogLevel::Error);
//! assert_eq!(entry.message, "disk ERROR");
//! assert!(entry.timestamp.is_some());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classifier;
pub mod decoder;
pub mod error;
pub mod ndjson;
pub mod processor;
pub mod types;

// Re-export main types
pub use classifier::{classify, clean_message, detect_level, extract_timestamp, parse_timestamp};
pub use decoder::{LineDecoder, LineSplitter, MAX_LINE_BYTES};
pub use error::{LogError, Result};
pub use ndjson::{NDJSON_CONTENT_TYPE, encode_entries, ndjson_entries, ndjson_reader};
pub use processor::{
    ChunkSink, FOLLOW_CHUNK_SIZE, RelayEnd, RelaySummary, collect_snapshot, relay_follow,
};
pub use types::{LogBatch, LogChunk, LogEntry, LogLevel, LogOptions, StreamKind};
