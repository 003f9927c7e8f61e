//! Cancellation and deadlines for executor calls.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use super::error::{AdapterError, AdapterResult, ExecError, ExecResult};

/// Per-call execution context.
///
/// Every adapter round-trip made on behalf of a context is raced against its
/// deadline and its cancellation signal. Cloning shares both.
#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    deadline: Option<(Instant, Duration)>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Cancels every [`ExecContext`] derived from the same
/// [`ExecContext::cancellable`] call.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

impl ExecContext {
    /// A context with no deadline that is never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Fail with [`ExecError::Timeout`] once `limit` has elapsed from now.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.deadline = Some((Instant::now() + limit, limit));
        self
    }

    /// Attach a cancellation signal.
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.cancel = Some(rx);
        (self, CancelHandle(Arc::new(tx)))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Time left before the deadline, if there is one.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|(at, _)| at.saturating_duration_since(Instant::now()))
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) {
        let deadline = async {
            match self.deadline {
                Some((at, _)) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            () = deadline => {}
            () = cancelled(self.cancel.clone()) => {}
        }
    }

    /// Drive one adapter call, wrapping its failure with `wrap`.
    ///
    /// The call is dropped mid-flight on cancellation or timeout.
    pub async fn run<T, F>(
        &self,
        call: F,
        wrap: impl FnOnce(AdapterError) -> ExecError,
    ) -> ExecResult<T>
    where
        F: Future<Output = AdapterResult<T>>,
    {
        if self.is_cancelled() {
            return Err(ExecError::Cancelled);
        }

        let work = async move { call.await.map_err(wrap) };
        let bounded = async {
            match self.deadline {
                Some((at, limit)) => tokio::time::timeout_at(at, work)
                    .await
                    .unwrap_or(Err(ExecError::Timeout(limit))),
                None => work.await,
            }
        };

        tokio::select! {
            result = bounded => result,
            () = cancelled(self.cancel.clone()) => Err(ExecError::Cancelled),
        }
    }
}

/// Resolves once the signal flips; pends forever without one.
async fn cancelled(signal: Option<watch::Receiver<bool>>) {
    if let Some(mut rx) = signal {
        if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await
}
