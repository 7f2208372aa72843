// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event store contract and the embedded in-memory store
//!
//! The store is the only shared mutable resource of a running saga. It
//! serializes appends so envelope ids are unique and ordered, and it
//! supports prepopulation with a historical prefix for replay.

use crate::event::{EventEnvelope, SagaEvent};
use crate::id::{IdGen, LongIdGen};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use thiserror::Error;

/// Errors raised by an event store
///
/// A failing append is fatal to the saga run: without a durable record
/// the coordinator can no longer guarantee recoverability.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("populate is only legal before the first append")]
    PopulateAfterAppend,
}

/// Append-only ordered log of event envelopes
///
/// `append` assigns the next id, persists the event, and makes it
/// visible to readers before returning. `populate` bulk-loads a
/// historical prefix preserving its ids and is rejected once any live
/// append has occurred.
pub trait EventStore: Send + Sync {
    fn append(&self, event: SagaEvent) -> Result<EventEnvelope, StoreError>;

    /// All envelopes in insertion order
    fn events(&self) -> Result<Vec<EventEnvelope>, StoreError>;

    fn populate(&self, envelopes: Vec<EventEnvelope>) -> Result<(), StoreError>;
}

/// In-memory event store
///
/// Backs tests and single-process deployments that do not need the log
/// to survive a restart; see `saga-storage` for the durable journal.
pub struct EmbeddedEventStore {
    envelopes: RwLock<Vec<EventEnvelope>>,
    ids: LongIdGen,
    appended: AtomicBool,
}

impl EmbeddedEventStore {
    pub fn new() -> Self {
        Self {
            envelopes: RwLock::new(Vec::new()),
            ids: LongIdGen::new(),
            appended: AtomicBool::new(false),
        }
    }
}

impl Default for EmbeddedEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for EmbeddedEventStore {
    fn append(&self, event: SagaEvent) -> Result<EventEnvelope, StoreError> {
        let mut envelopes = self
            .envelopes
            .write()
            .unwrap_or_else(|e| e.into_inner());

        // Id assignment and insertion happen under the same lock so
        // the log order matches the id order.
        self.appended.store(true, Ordering::SeqCst);
        let envelope = EventEnvelope::new(self.ids.next_id(), event);
        envelopes.push(envelope.clone());
        Ok(envelope)
    }

    fn events(&self) -> Result<Vec<EventEnvelope>, StoreError> {
        let envelopes = self.envelopes.read().unwrap_or_else(|e| e.into_inner());
        Ok(envelopes.clone())
    }

    fn populate(&self, envelopes: Vec<EventEnvelope>) -> Result<(), StoreError> {
        let mut slot = self.envelopes.write().unwrap_or_else(|e| e.into_inner());
        if self.appended.load(Ordering::SeqCst) {
            return Err(StoreError::PopulateAfterAppend);
        }

        if let Some(max_id) = envelopes.iter().map(|e| e.id).max() {
            self.ids.advance_to(max_id + 1);
        }
        *slot = envelopes;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
