// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task runners
//!
//! One small strategy per [`TaskKind`], dispatched on the tag. Every
//! runner records the start event before invoking the user capability
//! and the outcome event after it returns, so the log never loses track
//! of an in-flight operation.

use crate::error::SagaError;
use crate::event::SagaEvent;
use crate::request::{Fault, SagaRequest, TaskKind};
use crate::store::EventStore;

/// Outcome of a forward commit
#[derive(Debug)]
pub(crate) enum CommitOutcome {
    Completed,
    Aborted(Fault),
}

/// Outcome of one compensation attempt
#[derive(Debug)]
pub(crate) enum CompensateOutcome {
    Completed,
    Failed(Fault),
}

/// Run the forward operation of `request`, recording events around it
pub(crate) async fn commit(
    request: &SagaRequest,
    store: &dyn EventStore,
) -> Result<CommitOutcome, SagaError> {
    match request.task {
        TaskKind::SagaStart => {
            store.append(SagaEvent::SagaStarted {
                request_id: request.id.clone(),
            })?;
            tracing::info!(request = %request.id, "saga started");
            Ok(CommitOutcome::Completed)
        }

        TaskKind::Process => {
            store.append(SagaEvent::TransactionStarted {
                request_id: request.id.clone(),
            })?;
            tracing::info!(request = %request.id, "transaction started");

            match request.transaction.run().await {
                Ok(()) => {
                    store.append(SagaEvent::TransactionEnded {
                        request_id: request.id.clone(),
                    })?;
                    tracing::info!(request = %request.id, "transaction ended");
                    Ok(CommitOutcome::Completed)
                }
                // Whether the failure becomes a recorded abort or a
                // retry is the recovery policy's call, not the runner's.
                Err(fault) => Ok(CommitOutcome::Aborted(fault)),
            }
        }

        TaskKind::SagaEnd => {
            store.append(SagaEvent::SagaEnded {
                request_id: request.id.clone(),
                aborted: false,
            })?;
            tracing::info!(request = %request.id, "saga ended");
            Ok(CommitOutcome::Completed)
        }
    }
}

/// Record the abort of `request`'s transaction
///
/// Called once the recovery policy has decided against retrying. A log
/// with no `TransactionAborted` for a failed attempt reads as a retried
/// or hanging transaction on replay; only a recorded abort latches the
/// backward path.
pub(crate) async fn abort(
    request: &SagaRequest,
    fault: &Fault,
    store: &dyn EventStore,
) -> Result<(), SagaError> {
    store.append(SagaEvent::TransactionAborted {
        request_id: request.id.clone(),
        cause: fault.message().to_string(),
    })?;
    tracing::warn!(request = %request.id, cause = %fault, "transaction aborted");
    Ok(())
}

/// Run one compensation attempt for `request`
///
/// Retrying on failure is the caller's job; each attempt records a fresh
/// `CompensationStarted` so retries are observable in the log.
pub(crate) async fn compensate(
    request: &SagaRequest,
    store: &dyn EventStore,
) -> Result<CompensateOutcome, SagaError> {
    match request.task {
        // Terminal marker of a backward-completed saga.
        TaskKind::SagaStart | TaskKind::SagaEnd => {
            store.append(SagaEvent::SagaEnded {
                request_id: request.id.clone(),
                aborted: true,
            })?;
            tracing::info!(request = %request.id, "saga ended after compensation");
            Ok(CompensateOutcome::Completed)
        }

        TaskKind::Process => {
            store.append(SagaEvent::CompensationStarted {
                request_id: request.id.clone(),
            })?;
            tracing::info!(request = %request.id, "compensation started");

            match request.compensation.run().await {
                Ok(()) => {
                    store.append(SagaEvent::CompensationEnded {
                        request_id: request.id.clone(),
                    })?;
                    tracing::info!(request = %request.id, "compensation ended");
                    Ok(CompensateOutcome::Completed)
                }
                Err(fault) => {
                    tracing::error!(request = %request.id, cause = %fault, "compensation failed");
                    Ok(CompensateOutcome::Failed(fault))
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
