// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The saga front type
//!
//! A `Saga` is single-use: construct it with a store and a graph,
//! optionally fold an existing log with [`Saga::play`], then consume it
//! with [`Saga::run`], which drives execution to a terminal `SagaEnded`.

use crate::engine::{replay, CompensationPlanner, ForwardScheduler, ReplayedState};
use crate::error::SagaError;
use crate::graph::SagaGraph;
use crate::recovery::{BackwardRecovery, RecoveryPolicy};
use crate::store::EventStore;
use std::sync::Arc;

/// How a saga terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaOutcome {
    /// Every transaction committed and the forward `SagaEnded` was
    /// recorded
    Completed,
    /// A transaction aborted and every committed transaction was
    /// compensated
    Compensated,
}

/// A single saga instance
pub struct Saga {
    store: Arc<dyn EventStore>,
    graph: Arc<SagaGraph>,
    policy: Arc<dyn RecoveryPolicy>,
    replayed: ReplayedState,
}

impl Saga {
    /// A saga with the default backward-recovery policy
    pub fn new(store: Arc<dyn EventStore>, graph: SagaGraph) -> Self {
        Self::with_policy(store, Arc::new(BackwardRecovery), graph)
    }

    pub fn with_policy(
        store: Arc<dyn EventStore>,
        policy: Arc<dyn RecoveryPolicy>,
        graph: SagaGraph,
    ) -> Self {
        Self {
            store,
            graph: Arc::new(graph),
            policy,
            replayed: ReplayedState::default(),
        }
    }

    /// Fold the store's current contents into scheduler state
    ///
    /// Call once, after `populate`, before `run`. Skipping `play` on a
    /// non-empty store makes `run` re-execute from the beginning.
    pub fn play(&mut self) -> Result<(), SagaError> {
        let envelopes = self.store.events()?;
        self.replayed = replay(&self.graph, &envelopes)?;
        tracing::info!(
            events = envelopes.len(),
            completed = self.replayed.completed.len(),
            compensated = self.replayed.compensated.len(),
            partially_started = self.replayed.started.len(),
            partially_compensating = self.replayed.compensating.len(),
            aborted = self.replayed.aborted,
            "replayed event log"
        );
        Ok(())
    }

    /// Drive the saga to a terminal `SagaEnded`
    ///
    /// Resumes from whatever `play` reconstructed. Returns the saga's
    /// outcome; fatal coordinator failures (storage, inconsistent log,
    /// abandoned compensation) surface as errors instead.
    pub async fn run(self) -> Result<SagaOutcome, SagaError> {
        // A terminal log has nothing left to do.
        if let Some(aborted) = self.replayed.ended {
            return Ok(if aborted {
                SagaOutcome::Compensated
            } else {
                SagaOutcome::Completed
            });
        }

        if self.replayed.aborted {
            self.planner().run().await?;
            return Ok(SagaOutcome::Compensated);
        }

        let scheduler = ForwardScheduler::new(
            Arc::clone(&self.graph),
            Arc::clone(&self.store),
            Arc::clone(&self.policy),
        );
        let outcome = scheduler.run(self.replayed.completed.clone()).await?;

        if outcome.aborted {
            self.planner().run().await?;
            Ok(SagaOutcome::Compensated)
        } else {
            Ok(SagaOutcome::Completed)
        }
    }

    fn planner(&self) -> CompensationPlanner {
        CompensationPlanner::new(
            Arc::clone(&self.graph),
            Arc::clone(&self.store),
            Arc::clone(&self.policy),
        )
    }
}
