//! Per-request execution context.
//!
//! Carries the caller's deadline down to every repository call.
//! Cancellation is expressed by dropping the operation future; nothing
//! in the core spawns work that could outlive it.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::{AgentXmapError, AgentXmapResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context with no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Drive `fut` to completion, failing with `DeadlineExceeded` if the
    /// deadline passes first. An already expired context never polls `fut`.
    pub async fn run<T, F>(&self, fut: F) -> AgentXmapResult<T>
    where
        F: Future<Output = AgentXmapResult<T>>,
    {
        if self.is_expired() {
            return Err(AgentXmapError::DeadlineExceeded);
        }
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| AgentXmapError::DeadlineExceeded)?,
            None => fut.await,
        }
    }
}
