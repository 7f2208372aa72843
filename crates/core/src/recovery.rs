// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery policies
//!
//! A policy decides, per failure, whether the coordinator keeps pushing
//! forward (retry the same request) or rolls the saga back through
//! compensations.

use crate::request::{Fault, SagaRequest};
use std::time::Duration;

/// Decision returned by a recovery policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Re-issue the same operation without advancing the graph
    Retry,
    /// Stop forward progress and compensate committed transactions
    Abort,
}

/// Pluggable recovery strategy
pub trait RecoveryPolicy: Send + Sync {
    /// Consulted after a transaction failure; `attempts` counts the
    /// attempt that just failed, starting at 1.
    fn on_transaction_failure(
        &self,
        request: &SagaRequest,
        cause: &Fault,
        attempts: u32,
    ) -> Recovery;

    /// Consulted after a compensation failure. Compensations are retried
    /// until they succeed; answering `Abort` here abandons the rollback
    /// and surfaces a coordinator-level failure.
    fn on_compensation_failure(
        &self,
        _request: &SagaRequest,
        _cause: &Fault,
        _attempts: u32,
    ) -> Recovery {
        Recovery::Retry
    }

    /// Delay before the given retry attempt
    fn retry_delay(&self, _attempts: u32) -> Duration {
        Duration::ZERO
    }
}

/// Default policy: abort on the first transaction failure
///
/// Committed transactions are then undone in reverse causal order.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackwardRecovery;

impl RecoveryPolicy for BackwardRecovery {
    fn on_transaction_failure(
        &self,
        _request: &SagaRequest,
        _cause: &Fault,
        _attempts: u32,
    ) -> Recovery {
        Recovery::Abort
    }
}

/// Retry a failed transaction until it succeeds
///
/// Only safe for idempotent transactions; the saga author opts in by
/// selecting this policy. The default retries forever with no delay;
/// production deployments can bound attempts and space them out.
#[derive(Debug, Clone, Default)]
pub struct ForwardRecovery {
    max_attempts: Option<u32>,
    backoff: Option<Backoff>,
}

/// Exponential backoff between retry attempts
#[derive(Debug, Clone)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
}

impl Backoff {
    /// Delay before attempt `attempts + 1`, capped at `max`
    fn delay_for_attempt(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay = self.initial.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = delay.min(self.max.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

impl ForwardRecovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up after `max` failed attempts; the failure then aborts the
    /// saga and backward recovery takes over.
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = Some(max);
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = Some(backoff);
        self
    }
}

impl RecoveryPolicy for ForwardRecovery {
    fn on_transaction_failure(
        &self,
        _request: &SagaRequest,
        _cause: &Fault,
        attempts: u32,
    ) -> Recovery {
        match self.max_attempts {
            Some(max) if attempts >= max => Recovery::Abort,
            _ => Recovery::Retry,
        }
    }

    fn retry_delay(&self, attempts: u32) -> Duration {
        self.backoff
            .as_ref()
            .map(|b| b.delay_for_attempt(attempts))
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
