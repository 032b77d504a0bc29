//! Snapshot collection and live relaying of container logs.
//!
//! This module provides:
//! - [`collect_snapshot`] - Drain a bounded frame stream into a [`LogBatch`]
//! - [`relay_follow`] - Forward a live byte source to a consumer as it arrives
//! - [`ChunkSink`] - Where relayed bytes go

use std::future::Future;
use std::io;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::decoder::LineDecoder;
use crate::error::{LogError, Result};
use crate::types::{LogBatch, LogChunk};

/// Size of each read from a live source.
pub const FOLLOW_CHUNK_SIZE: usize = 32 * 1024;

/// Reads a bounded frame stream to the end and classifies every line.
///
/// Any source error fails the whole call.
pub async fn collect_snapshot<S, E>(chunks: S) -> std::result::Result<LogBatch, E>
where
    S: Stream<Item = std::result::Result<LogChunk, E>>,
{
    tokio::pin!(chunks);
    let mut decoder = LineDecoder::new();
    let mut logs = Vec::new();
    while let Some(chunk) = chunks.next().await {
        logs.extend(decoder.push(&chunk?));
    }
    logs.extend(decoder.finish());
    Ok(LogBatch::from(logs))
}

/// Destination of a live relay.
pub trait ChunkSink: Send {
    /// Delivers one chunk. An error means the consumer is gone.
    fn write(&mut self, chunk: Bytes) -> impl Future<Output = Result<()>> + Send;

    /// Pushes delivered chunks through to the consumer.
    fn flush(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Resolves once the consumer has gone away.
    fn closed(&self) -> impl Future<Output = ()> + Send;
}

/// Feeds an HTTP body (or any other channel reader).
///
/// Every send hands the chunk over immediately, so flushing is a no-op.
impl ChunkSink for mpsc::Sender<io::Result<Bytes>> {
    fn write(&mut self, chunk: Bytes) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.send(Ok(chunk))
                .await
                .map_err(|_| LogError::StreamClosed)
        }
    }

    fn flush(&mut self) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }

    fn closed(&self) -> impl Future<Output = ()> + Send {
        mpsc::Sender::closed(self)
    }
}

/// Why a relay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    /// The source reached end of stream.
    SourceClosed,
    /// The consumer disconnected or stopped accepting writes.
    ConsumerGone,
    /// The cancellation token fired.
    Cancelled,
    /// The source failed after output had already been sent.
    SourceFailed,
}

/// Outcome of a finished relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySummary {
    /// Total bytes handed to the sink.
    pub bytes_forwarded: u64,
    /// Number of writes made to the sink.
    pub chunks_forwarded: u64,
    /// Why the relay stopped.
    pub end: RelayEnd,
}

/// Forwards a live source to a sink, one read at a time.
///
/// Bytes are passed through untouched in reads of at most
/// [`FOLLOW_CHUNK_SIZE`], each written and flushed before the next read.
/// The source is owned by the relay and dropped on every exit path.
///
/// A read error before anything was forwarded is returned; after output
/// has started it just ends the relay.
pub async fn relay_follow<R, K>(
    reader: R,
    sink: &mut K,
    cancel: &CancellationToken,
) -> Result<RelaySummary>
where
    R: AsyncRead,
    K: ChunkSink,
{
    tokio::pin!(reader);
    let mut buf = vec![0_u8; FOLLOW_CHUNK_SIZE];
    let mut bytes_forwarded = 0_u64;
    let mut chunks_forwarded = 0_u64;

    let end = loop {
        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => break RelayEnd::Cancelled,
            () = sink.closed() => break RelayEnd::ConsumerGone,
            read = reader.read(&mut buf) => read,
        };

        let n = match read {
            Ok(0) => break RelayEnd::SourceClosed,
            Ok(n) => n,
            Err(err) if bytes_forwarded == 0 => return Err(LogError::Source(err)),
            Err(err) => {
                warn!(error = %err, bytes_forwarded, "log source failed mid-stream");
                break RelayEnd::SourceFailed;
            }
        };

        let chunk = Bytes::copy_from_slice(&buf[..n]);
        let delivered = tokio::select! {
            biased;
            () = cancel.cancelled() => break RelayEnd::Cancelled,
            delivered = forward(sink, chunk) => delivered,
        };
        if delivered.is_err() {
            break RelayEnd::ConsumerGone;
        }

        bytes_forwarded += n as u64;
        chunks_forwarded += 1;
    };

    debug!(bytes_forwarded, chunks_forwarded, end = ?end, "log relay finished");
    Ok(RelaySummary {
        bytes_forwarded,
        chunks_forwarded,
        end,
    })
}

async fn forward<K: ChunkSink>(sink: &mut K, chunk: Bytes) -> Result<()> {
    sink.write(chunk).await?;
    sink.flush().await
}
