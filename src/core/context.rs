//! Per-call transaction context
//!
//! A `TxContext` travels explicitly through every core and storage call. It
//! carries the diagnostic span that names the transaction in logs, and the
//! caller's cancellation signal and deadline. Storage adapters wrap every point
//! where they may wait (lock acquisition, queries, commit) in [`TxContext::guard`].

use crate::types::LedgerError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Span;

/// Explicit context for one transactional call
#[derive(Debug, Clone)]
pub struct TxContext {
    span: Span,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl TxContext {
    /// Create a context whose log lines are tagged with `name`
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            span: tracing::debug_span!("ledger_tx", tx = %name.as_ref()),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Context with no name, no deadline and a token nobody cancels
    pub fn background() -> Self {
        Self {
            span: Span::none(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Share an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run a storage future, giving up when the context is cancelled or its deadline passes
    ///
    /// Cancellation is checked first so an already-cancelled context never starts `fut`.
    pub async fn guard<T, F>(&self, operation: &str, fut: F) -> Result<T, LedgerError>
    where
        F: Future<Output = Result<T, LedgerError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(LedgerError::cancelled(operation));
        }

        let bounded = async {
            match self.deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(LedgerError::deadline_exceeded(operation)),
                },
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(LedgerError::cancelled(operation)),
            result = bounded => result,
        }
    }
}

impl Default for TxContext {
    fn default() -> Self {
        Self::background()
    }
}
