// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bulkhead: bounded concurrency per dependency, with an acquire timeout.
//!
//! Permits are RAII guards, so a slot is released on every exit path.

use lf_core::NodeError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct Bulkhead {
    name: String,
    semaphore: Arc<Semaphore>,
    acquire_timeout: Duration,
}

impl Bulkhead {
    pub fn new(name: impl Into<String>, slots: usize, acquire_timeout: Duration) -> Self {
        Self { name: name.into(), semaphore: Arc::new(Semaphore::new(slots)), acquire_timeout }
    }

    /// Acquire a slot or fail retryable after the acquire timeout.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, NodeError> {
        match tokio::time::timeout(
            self.acquire_timeout,
            self.semaphore.clone().acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(NodeError::retryable(
                "BULKHEAD_CLOSED",
                format!("bulkhead {} closed", self.name),
            )),
            Err(_) => Err(NodeError::retryable(
                "BULKHEAD_TIMEOUT",
                format!("no free slot in bulkhead {} within {:?}", self.name, self.acquire_timeout),
            )),
        }
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
#[path = "bulkhead_tests.rs"]
mod tests;
