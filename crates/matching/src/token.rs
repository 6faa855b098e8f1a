// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signed task tokens.
//!
//! A token proves the holder received the task from this matching service:
//! the payload is signed with the service secret and verified in constant
//! time on ack/nack.

use crate::error::MatchingError;
use lf_core::{canonical_fingerprint, TaskId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    pub task_id: TaskId,
    pub namespace: String,
    pub task_queue: String,
    pub partition: u32,
    /// Delivery count at issue time; a reclaimed task gets a fresh token.
    pub delivery: u32,
    pub nonce: String,
}

/// Opaque to everyone but the matching service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskToken {
    pub payload: TokenPayload,
    sig: String,
}

impl TaskToken {
    pub fn task_id(&self) -> TaskId {
        self.payload.task_id
    }
}

pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    fn digest(&self, payload: &TokenPayload) -> Result<String, MatchingError> {
        let value = serde_json::to_value(payload).map_err(|_| MatchingError::InvalidToken)?;
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(canonical_fingerprint(&value).as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    pub fn sign(&self, payload: TokenPayload) -> Result<TaskToken, MatchingError> {
        let sig = self.digest(&payload)?;
        Ok(TaskToken { payload, sig })
    }

    pub fn verify(&self, token: &TaskToken) -> Result<(), MatchingError> {
        let expected = self.digest(&token.payload)?;
        if constant_time_eq(expected.as_bytes(), token.sig.as_bytes()) {
            Ok(())
        } else {
            Err(MatchingError::InvalidToken)
        }
    }
}

/// Byte-wise comparison that does not short-circuit on the first mismatch.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
