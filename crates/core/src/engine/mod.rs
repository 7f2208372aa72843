// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Saga execution engine
//!
//! Three cooperating pieces: the replay fold that rebuilds scheduler
//! state from a log prefix, the forward scheduler that drives the graph
//! root-to-leaf, and the compensation planner that unwinds committed
//! transactions in reverse causal order.

pub(crate) mod planner;
pub(crate) mod replay;
pub(crate) mod scheduler;

pub(crate) use planner::CompensationPlanner;
pub(crate) use replay::{replay, ReplayedState};
pub(crate) use scheduler::ForwardScheduler;
