//! Per-call cancellation and deadlines.

use std::future::Future;
use std::time::Duration;

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{EngineError, EngineResult};

/// Cancellation token plus an optional deadline, passed to every engine call.
///
/// Cloning shares the token. [`CallContext::child`] derives a context that
/// is cancelled with its parent but can also be cancelled on its own.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Creates a context with a fresh token and no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context driven by an existing token.
    #[must_use]
    pub const fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Sets the deadline to `timeout` from now, keeping any earlier one.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.with_deadline(deadline)
    }

    /// Sets the deadline, keeping any earlier one.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        self
    }

    /// Derives a context cancelled together with this one.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// The underlying token.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this context and its children.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once cancelled or past the deadline.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// The error describing why this context ended.
    #[must_use]
    pub fn cancellation_error(&self) -> EngineError {
        if !self.token.is_cancelled() && self.deadline.is_some_and(|d| Instant::now() >= d) {
            EngineError::DeadlineExceeded
        } else {
            EngineError::Cancelled
        }
    }

    /// Resolves when the context is cancelled or the deadline passes.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.token.cancelled() => {}
                    () = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Runs `fut` unless the context ends first.
    pub async fn run<T, F>(&self, fut: F) -> EngineResult<T>
    where
        F: Future<Output = EngineResult<T>>,
    {
        if self.is_cancelled() {
            return Err(self.cancellation_error());
        }
        tokio::select! {
            biased;
            () = self.cancelled() => Err(self.cancellation_error()),
            result = fut => result,
        }
    }

    /// Ends `stream` when the context ends, with a final error item.
    pub fn guard_stream<S, T>(&self, stream: S) -> BoxStream<'static, EngineResult<T>>
    where
        S: Stream<Item = EngineResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let state = (stream.boxed(), self.clone(), false);
        stream::unfold(state, |(mut inner, ctx, done)| async move {
            if done {
                return None;
            }
            tokio::select! {
                biased;
                () = ctx.cancelled() => {
                    let err = ctx.cancellation_error();
                    Some((Err(err), (inner, ctx, true)))
                }
                item = inner.next() => item.map(|item| (item, (inner, ctx, false))),
            }
        })
        .boxed()
    }
}
