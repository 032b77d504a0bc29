//! Newline-delimited JSON encoding of classified entries.
//!
//! Live log output is delivered as one JSON [`LogEntry`] per line. The
//! stream here does the classification; whatever relays it downstream only
//! moves bytes.

use std::io;

use bytes::Bytes;
use futures::{Stream, StreamExt, stream};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

use crate::decoder::LineDecoder;
use crate::types::{LogChunk, LogEntry};

/// Content type of an NDJSON response body.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Serializes entries as NDJSON, one object per line.
pub fn encode_entries(entries: &[LogEntry]) -> io::Result<Bytes> {
    let mut buf = Vec::with_capacity(entries.len() * 160);
    for entry in entries {
        serde_json::to_writer(&mut buf, entry)?;
        buf.push(b'\n');
    }
    Ok(Bytes::from(buf))
}

struct EncoderState<S> {
    chunks: Option<S>,
    decoder: LineDecoder,
}

/// Classifies an engine frame stream and encodes it as NDJSON.
///
/// Each yielded buffer holds the entries completed by one frame. A source
/// error is yielded once and ends the stream; partial lines are flushed
/// when the source ends cleanly.
pub fn ndjson_entries<S, E>(chunks: S) -> impl Stream<Item = io::Result<Bytes>> + Send
where
    S: Stream<Item = Result<LogChunk, E>> + Send + Unpin,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
{
    let state = EncoderState {
        chunks: Some(chunks),
        decoder: LineDecoder::new(),
    };

    stream::unfold(state, |mut state| async move {
        loop {
            let chunks = state.chunks.as_mut()?;
            let next = chunks.next().await;
            match next {
                Some(Ok(chunk)) => {
                    let entries = state.decoder.push(&chunk);
                    if !entries.is_empty() {
                        return Some((encode_entries(&entries), state));
                    }
                }
                Some(Err(err)) => {
                    state.chunks = None;
                    return Some((Err(io::Error::other(err)), state));
                }
                None => {
                    state.chunks = None;
                    let entries = state.decoder.finish();
                    if entries.is_empty() {
                        return None;
                    }
                    return Some((encode_entries(&entries), state));
                }
            }
        }
    })
}

/// Exposes [`ndjson_entries`] as a byte reader.
pub fn ndjson_reader<S, E>(chunks: S) -> impl AsyncRead + Send + Unpin
where
    S: Stream<Item = Result<LogChunk, E>> + Send + Unpin,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
{
    StreamReader::new(Box::pin(ndjson_entries(chunks)))
}
