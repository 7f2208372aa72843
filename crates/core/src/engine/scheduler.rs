// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forward scheduler
//!
//! Drives the graph from root to leaf. Independent branches run
//! concurrently; a node is dispatched once every parent has completed.
//! Dispatch decisions are made under a single lock, the work itself runs
//! outside it, and outcomes are committed back under the lock.

use crate::error::SagaError;
use crate::graph::{NodeId, SagaGraph};
use crate::recovery::{Recovery, RecoveryPolicy};
use crate::request::SagaRequest;
use crate::store::EventStore;
use crate::task::{self, CommitOutcome};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tokio::time::sleep;

/// Result of a forward pass
pub(crate) struct ForwardOutcome {
    pub aborted: bool,
}

/// Frontier bookkeeping shared by all worker tasks
struct Frontier {
    completed: HashSet<NodeId>,
    in_flight: HashSet<NodeId>,
    aborted: bool,
}

pub(crate) struct ForwardScheduler {
    graph: Arc<SagaGraph>,
    store: Arc<dyn EventStore>,
    policy: Arc<dyn RecoveryPolicy>,
}

impl ForwardScheduler {
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

    /// Execute the unfinished portion of the graph
    ///
    /// `completed` seeds the frontier, usually from replay. Returns once
    /// the leaf committed or, after an abort, once every in-flight
    /// transaction has settled. In-flight transactions are never
    /// cancelled; a late outcome must reach the log so the planner knows
    /// whether to compensate it.
    pub(crate) async fn run(
        &self,
        completed: HashSet<NodeId>,
    ) -> Result<ForwardOutcome, SagaError> {
        let state = Mutex::new(Frontier {
            completed,
            in_flight: HashSet::new(),
            aborted: false,
        });
        let mut tasks: JoinSet<Result<(NodeId, CommitOutcome), SagaError>> = JoinSet::new();

        self.dispatch_ready(&state, &mut tasks);

        while let Some(joined) = tasks.join_next().await {
            let (node, outcome) = joined.map_err(|e| SagaError::Worker(e.to_string()))??;

            let mut frontier = state.lock().unwrap_or_else(|e| e.into_inner());
            frontier.in_flight.remove(&node);
            match outcome {
                CommitOutcome::Completed => {
                    frontier.completed.insert(node);
                    let aborted = frontier.aborted;
                    drop(frontier);
                    if !aborted {
                        self.dispatch_ready(&state, &mut tasks);
                    }
                }
                CommitOutcome::Aborted(_) => {
                    if !frontier.aborted {
                        frontier.aborted = true;
                        let in_flight = frontier.in_flight.len();
                        tracing::warn!(node = %node, in_flight, "abort latched; draining in-flight transactions");
                    }
                }
            }
        }

        let frontier = state.into_inner().unwrap_or_else(|e| e.into_inner());
        Ok(ForwardOutcome {
            aborted: frontier.aborted,
        })
    }

    /// Dispatch every node whose parents have all completed
    ///
    /// Readiness evaluation and in-flight marking happen under one lock
    /// so a node cannot be dispatched twice.
    fn dispatch_ready(
        &self,
        state: &Mutex<Frontier>,
        tasks: &mut JoinSet<Result<(NodeId, CommitOutcome), SagaError>>,
    ) {
        let mut frontier = state.lock().unwrap_or_else(|e| e.into_inner());
        if frontier.aborted {
            return;
        }

        let ready: Vec<NodeId> = self
            .graph
            .nodes()
            .filter(|&node| {
                !frontier.completed.contains(&node)
                    && !frontier.in_flight.contains(&node)
                    && self
                        .graph
                        .parents(node)
                        .iter()
                        .all(|parent| frontier.completed.contains(parent))
            })
            .collect();

        for node in ready {
            frontier.in_flight.insert(node);
            tracing::debug!(node = %node, request = %self.graph.request(node).id, "dispatching");

            let request = self.graph.request(node).clone();
            let store = Arc::clone(&self.store);
            let policy = Arc::clone(&self.policy);
            tasks.spawn(async move {
                let outcome = commit_with_retry(&request, store.as_ref(), policy.as_ref()).await?;
                Ok((node, outcome))
            });
        }
    }
}

/// Commit one request, re-issuing it as long as the policy says retry
async fn commit_with_retry(
    request: &SagaRequest,
    store: &dyn EventStore,
    policy: &dyn RecoveryPolicy,
) -> Result<CommitOutcome, SagaError> {
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match task::commit(request, store).await? {
            CommitOutcome::Completed => return Ok(CommitOutcome::Completed),
            CommitOutcome::Aborted(fault) => {
                match policy.on_transaction_failure(request, &fault, attempts) {
                    Recovery::Retry => {
                        // No abort is recorded for a retried failure; the
                        // fresh TransactionStarted keeps retries observable.
                        tracing::warn!(request = %request.id, attempts, cause = %fault, "retrying transaction");
                        let delay = policy.retry_delay(attempts);
                        if !delay.is_zero() {
                            sleep(delay).await;
                        }
                    }
                    Recovery::Abort => {
                        task::abort(request, &fault, store).await?;
                        return Ok(CommitOutcome::Aborted(fault));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
