// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compensation planner
//!
//! Activated after the forward scheduler latched an abort and every
//! in-flight transaction settled. The set of transactions to undo is
//! derived from the log, never from in-memory scheduler state: every
//! node with a `TransactionEnded` and no matching `CompensationEnded`
//! is compensated, in reverse causal order.

use super::replay::replay;
use crate::error::SagaError;
use crate::graph::{NodeId, SagaGraph};
use crate::recovery::{Recovery, RecoveryPolicy};
use crate::request::SagaRequest;
use crate::store::EventStore;
use crate::task::{self, CompensateOutcome};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::sleep;

pub(crate) struct CompensationPlanner {
    graph: Arc<SagaGraph>,
    store: Arc<dyn EventStore>,
    policy: Arc<dyn RecoveryPolicy>,
}

impl CompensationPlanner {
    pub(crate) fn new(
        graph: Arc<SagaGraph>,
        store: Arc<dyn EventStore>,
        policy: Arc<dyn RecoveryPolicy>,
    ) -> Self {
        Self {
            graph,
            store,
            policy,
        }
    }

    /// Undo every committed transaction, then record the backward
    /// terminal `SagaEnded`
    pub(crate) async fn run(&self) -> Result<(), SagaError> {
        let state = replay(&self.graph, &self.store.events()?)?;
        let mut pending: HashSet<NodeId> = state
            .completed
            .iter()
            .copied()
            .filter(|&node| node != self.graph.root() && node != self.graph.leaf())
            .collect();

        tracing::info!(count = pending.len(), "compensating committed transactions");

        while !pending.is_empty() {
            // A node goes only once all of its still-pending descendants
            // have been compensated; siblings within a wave run
            // concurrently.
            let wave: Vec<NodeId> = pending
                .iter()
                .copied()
                .filter(|&node| {
                    self.graph
                        .descendants(node)
                        .iter()
                        .all(|descendant| !pending.contains(descendant))
                })
                .collect();

            let mut tasks: JoinSet<Result<NodeId, SagaError>> = JoinSet::new();
            for node in wave {
                let request = self.graph.request(node).clone();
                let store = Arc::clone(&self.store);
                let policy = Arc::clone(&self.policy);
                tasks.spawn(async move {
                    compensate_with_retry(&request, store.as_ref(), policy.as_ref()).await?;
                    Ok(node)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                let node = joined.map_err(|e| SagaError::Worker(e.to_string()))??;
                pending.remove(&node);
            }
        }

        // The saga-start compensation marks the backward termination.
        let root = self.graph.request(self.graph.root()).clone();
        task::compensate(&root, self.store.as_ref()).await?;
        Ok(())
    }
}

/// Compensate one request, retrying per policy until it succeeds
///
/// Every attempt records a fresh `CompensationStarted`, so retries are
/// observable in the log. A policy that gives up leaves the saga
/// partially rolled back; that is a coordinator-level incident.
async fn compensate_with_retry(
    request: &SagaRequest,
    store: &dyn EventStore,
    policy: &dyn RecoveryPolicy,
) -> Result<(), SagaError> {
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match task::compensate(request, store).await? {
            CompensateOutcome::Completed => return Ok(()),
            CompensateOutcome::Failed(fault) => {
                match policy.on_compensation_failure(request, &fault, attempts) {
                    Recovery::Retry => {
                        tracing::warn!(request = %request.id, attempts, "retrying compensation");
                        let delay = policy.retry_delay(attempts);
                        if !delay.is_zero() {
                            sleep(delay).await;
                        }
                    }
                    Recovery::Abort => {
                        return Err(SagaError::CompensationExhausted {
                            request: request.id.clone(),
                            attempts,
                            cause: fault.message().to_string(),
                        })
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod tests;
