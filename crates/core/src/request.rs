// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Saga requests and the consumer-supplied capability traits

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure cause raised by a transaction or compensation
///
/// The cause is recorded verbatim in the event log, so it must carry
/// everything an operator needs to diagnose the abort.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct Fault(String);

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Forward operation of a saga request
///
/// Called at most once per attempt; the coordinator may invoke it again
/// across retries or after a replay found it partially started, so only
/// idempotent operations are safe under forward recovery.
#[async_trait]
pub trait Transaction: Send + Sync {
    async fn run(&self) -> Result<(), Fault>;
}

/// Semantic inverse of a transaction
///
/// Invoked during backward recovery to undo the transaction's visible
/// effect. Failures are retried until the compensation succeeds.
#[async_trait]
pub trait Compensation: Send + Sync {
    async fn run(&self) -> Result<(), Fault>;
}

/// Which runner executes a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Synthetic root; commit records `SagaStarted` and never fails
    SagaStart,
    /// User work with a paired compensation
    Process,
    /// Synthetic leaf; commit records the terminal `SagaEnded`
    SagaEnd,
}

/// No-op capability backing the synthetic root and leaf
struct NoOpCapability;

#[async_trait]
impl Transaction for NoOpCapability {
    async fn run(&self) -> Result<(), Fault> {
        Ok(())
    }
}

#[async_trait]
impl Compensation for NoOpCapability {
    async fn run(&self) -> Result<(), Fault> {
        Ok(())
    }
}

/// Request id of the synthetic root
pub const SAGA_START_ID: &str = "saga-start";

/// Request id of the synthetic leaf
pub const SAGA_END_ID: &str = "saga-end";

/// An identified unit of work within a saga
#[derive(Clone)]
pub struct SagaRequest {
    pub id: String,
    pub transaction: Arc<dyn Transaction>,
    pub compensation: Arc<dyn Compensation>,
    pub task: TaskKind,
}

impl SagaRequest {
    /// A process request with user-supplied transaction and compensation
    pub fn new(
        id: impl Into<String>,
        transaction: Arc<dyn Transaction>,
        compensation: Arc<dyn Compensation>,
    ) -> Self {
        Self {
            id: id.into(),
            transaction,
            compensation,
            task: TaskKind::Process,
        }
    }

    /// The synthetic root request
    pub fn saga_start() -> Self {
        Self {
            id: SAGA_START_ID.to_string(),
            transaction: Arc::new(NoOpCapability),
            compensation: Arc::new(NoOpCapability),
            task: TaskKind::SagaStart,
        }
    }

    /// The synthetic leaf request
    pub fn saga_end() -> Self {
        Self {
            id: SAGA_END_ID.to_string(),
            transaction: Arc::new(NoOpCapability),
            compensation: Arc::new(NoOpCapability),
            task: TaskKind::SagaEnd,
        }
    }
}

impl fmt::Debug for SagaRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SagaRequest")
            .field("id", &self.id)
            .field("task", &self.task)
            .finish()
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
