//! Container engine trait definition.

use futures::future::BoxFuture;
use futures::stream::BoxStream;

use deck_logs::{LogChunk, LogOptions};
use deck_metrics::UsageSnapshot;

use crate::context::CallContext;
use crate::error::EngineResult;
use crate::types::{ContainerDetails, ContainerInfo};

/// Demultiplexed log frames from one container.
pub type LogChunkStream = BoxStream<'static, EngineResult<LogChunk>>;

/// Read-only access to one container engine.
///
/// Implementations honor the [`CallContext`] themselves: a call whose
/// context is cancelled or past its deadline fails with
/// [`EngineError::Cancelled`](crate::EngineError::Cancelled) or
/// [`EngineError::DeadlineExceeded`](crate::EngineError::DeadlineExceeded).
pub trait ContainerEngine: Send + Sync {
    /// Lists containers; with `all == false`, only running ones.
    ///
    /// Returned records have an empty `host`; callers tag them.
    ///
    /// # Errors
    ///
    /// Returns error if the engine cannot be queried.
    fn list_containers<'a>(
        &'a self,
        ctx: &'a CallContext,
        all: bool,
    ) -> BoxFuture<'a, EngineResult<Vec<ContainerInfo>>>;

    /// Returns details of one container.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`](crate::EngineError::NotFound) for
    /// an unknown container.
    fn inspect_container<'a>(
        &'a self,
        ctx: &'a CallContext,
        id: &'a str,
    ) -> BoxFuture<'a, EngineResult<ContainerDetails>>;

    /// Opens the log source of one container.
    ///
    /// The call resolves once the container is known to exist. The stream
    /// is bounded unless `options.follow` is set, and ends with an error
    /// item when `ctx` ends.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`](crate::EngineError::NotFound) for
    /// an unknown container.
    fn read_logs<'a>(
        &'a self,
        ctx: &'a CallContext,
        id: &'a str,
        options: &'a LogOptions,
    ) -> BoxFuture<'a, EngineResult<LogChunkStream>>;

    /// Reads one resource usage snapshot, including the previous counters.
    ///
    /// # Errors
    ///
    /// Returns error if the engine cannot produce stats for the container.
    fn sample_usage<'a>(
        &'a self,
        ctx: &'a CallContext,
        id: &'a str,
    ) -> BoxFuture<'a, EngineResult<UsageSnapshot>>;

    /// Checks that the engine is reachable.
    ///
    /// # Errors
    ///
    /// Returns error if the engine does not answer.
    fn ping<'a>(&'a self, ctx: &'a CallContext) -> BoxFuture<'a, EngineResult<()>>;

    /// Short engine kind, for logs.
    fn kind(&self) -> &'static str;
}
