// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay: scheduler state as a fold of the event log
//!
//! Given any prefix of a saga's log, the fold reconstructs exactly the
//! state the scheduler had when that prefix was written. Nothing the
//! scheduler tracks lives outside this reconstruction.

use crate::error::SagaError;
use crate::event::{EventEnvelope, SagaEvent};
use crate::graph::{NodeId, SagaGraph};
use std::collections::HashSet;

/// Scheduler state reconstructed from a log prefix
#[derive(Debug, Default)]
pub(crate) struct ReplayedState {
    /// Nodes whose transaction committed and has not been compensated.
    /// Includes the root once `SagaStarted` is recorded.
    pub completed: HashSet<NodeId>,
    /// Nodes whose compensation completed
    pub compensated: HashSet<NodeId>,
    /// Nodes with a `TransactionStarted` but no terminal event; these
    /// are re-executed on resume
    pub started: HashSet<NodeId>,
    /// Nodes with a `CompensationStarted` but no `CompensationEnded`;
    /// these are re-compensated on resume
    pub compensating: HashSet<NodeId>,
    /// Latched once any abort or compensation activity is seen
    pub aborted: bool,
    /// `Some(aborted)` once the terminal `SagaEnded` is seen
    pub ended: Option<bool>,
}

/// Fold `envelopes` into the state the scheduler had after writing them
pub(crate) fn replay(
    graph: &SagaGraph,
    envelopes: &[EventEnvelope],
) -> Result<ReplayedState, SagaError> {
    let mut state = ReplayedState::default();

    for envelope in envelopes {
        if state.ended.is_some() {
            return Err(SagaError::InconsistentLog(format!(
                "event {} recorded after the terminal SagaEnded",
                envelope.id
            )));
        }

        let request_id = envelope.event.request_id();
        let node = graph.node_for_request(request_id).ok_or_else(|| {
            SagaError::InconsistentLog(format!("unknown request id '{}'", request_id))
        })?;

        match &envelope.event {
            SagaEvent::SagaStarted { .. } => {
                if node != graph.root() {
                    return Err(SagaError::InconsistentLog(format!(
                        "SagaStarted recorded for non-root request '{}'",
                        request_id
                    )));
                }
                state.completed.insert(node);
            }

            SagaEvent::TransactionStarted { .. } => {
                state.started.insert(node);
            }

            SagaEvent::TransactionEnded { .. } => {
                if !state.started.remove(&node) {
                    return Err(SagaError::InconsistentLog(format!(
                        "TransactionEnded without a start for request '{}'",
                        request_id
                    )));
                }
                state.completed.insert(node);
            }

            SagaEvent::TransactionAborted { .. } => {
                if !state.started.remove(&node) {
                    return Err(SagaError::InconsistentLog(format!(
                        "TransactionAborted without a start for request '{}'",
                        request_id
                    )));
                }
                state.aborted = true;
            }

            SagaEvent::CompensationStarted { .. } => {
                if !state.completed.contains(&node) {
                    return Err(SagaError::InconsistentLog(format!(
                        "CompensationStarted without TransactionEnded for request '{}'",
                        request_id
                    )));
                }
                state.compensating.insert(node);
                state.aborted = true;
            }

            SagaEvent::CompensationEnded { .. } => {
                if !state.compensating.remove(&node) {
                    return Err(SagaError::InconsistentLog(format!(
                        "CompensationEnded without a start for request '{}'",
                        request_id
                    )));
                }
                state.completed.remove(&node);
                state.compensated.insert(node);
                state.aborted = true;
            }

            SagaEvent::SagaEnded { aborted, .. } => {
                state.ended = Some(*aborted);
            }
        }
    }

    Ok(state)
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
