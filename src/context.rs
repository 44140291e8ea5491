// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request operation context.
//!
//! Carries the request id, a cancellation token, and an optional deadline
//! through the lifecycle engine and the encrypted-field gateway, so a slow
//! transit backend or storage call cannot hang the calling request.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why an operation stopped before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    #[error("request cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone)]
pub struct OpContext {
    request_id: Option<String>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for OpContext {
    fn default() -> Self {
        Self::background()
    }
}

impl OpContext {
    /// Context with no deadline that is never cancelled.
    pub fn background() -> Self {
        Self {
            request_id: None,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Bound the context to `timeout` from now. An earlier deadline wins.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Tie the context to an externally owned token (e.g. server shutdown).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Fail fast if the context is already done.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.cancel.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Interrupted::DeadlineExceeded);
            }
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the context is cancelled or expires
    /// first. Cancellation is observed before the future is polled.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, Interrupted>
    where
        F: Future<Output = T>,
    {
        let deadline = self.deadline;
        let expiry = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            _ = expiry => Err(Interrupted::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}
