// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator-level errors
//!
//! A saga that aborts and is compensated is not an error: `run` reports
//! it as a normal outcome. These variants cover the conditions under
//! which the coordinator itself cannot proceed.

use crate::store::StoreError;
use thiserror::Error;

/// Fatal failures surfaced by [`crate::Saga::run`]
#[derive(Debug, Error)]
pub enum SagaError {
    /// The event store failed; without a durable record the saga cannot
    /// guarantee recoverability.
    #[error("event store failure: {0}")]
    Store(#[from] StoreError),

    /// The event log contradicts the graph it is replayed against.
    #[error("event log inconsistent with graph: {0}")]
    InconsistentLog(String),

    /// The recovery policy gave up on a compensation; the saga is left
    /// partially rolled back.
    #[error("compensation for request '{request}' abandoned after {attempts} attempts: {cause}")]
    CompensationExhausted {
        request: String,
        attempts: u32,
        cause: String,
    },

    /// A scheduler worker task died without reporting an outcome.
    #[error("worker task failed: {0}")]
    Worker(String),
}
