// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error(transparent)]
    History(#[from] lf_history::HistoryError),

    #[error("callback to {url} failed after {attempts} attempts: {last_error}")]
    CallbackExhausted { url: String, attempts: u32, last_error: String },

    #[error("http surface: {0}")]
    Io(#[from] std::io::Error),
}
