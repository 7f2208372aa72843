use super::*;
use crate::request::{Compensation, Transaction};
use crate::store::EmbeddedEventStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

struct Scripted {
    fail_first: u32,
    runs: AtomicU32,
}

impl Scripted {
    fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            fail_first: 0,
            runs: AtomicU32::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_first: u32::MAX,
            runs: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl Transaction for Scripted {
    async fn run(&self) -> Result<(), Fault> {
        let run = self.runs.fetch_add(1, Ordering::SeqCst);
        if run < self.fail_first {
            Err(Fault::new("scripted failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Compensation for Scripted {
    async fn run(&self) -> Result<(), Fault> {
        let run = self.runs.fetch_add(1, Ordering::SeqCst);
        if run < self.fail_first {
            Err(Fault::new("scripted failure"))
        } else {
            Ok(())
        }
    }
}

fn kinds(store: &EmbeddedEventStore) -> Vec<&'static str> {
    store
        .events()
        .unwrap()
        .iter()
        .map(|e| e.event.kind())
        .collect()
}

#[tokio::test]
async fn saga_start_commit_records_saga_started() {
    let store = EmbeddedEventStore::new();
    let outcome = commit(&SagaRequest::saga_start(), &store).await.unwrap();

    assert!(matches!(outcome, CommitOutcome::Completed));
    assert_eq!(kinds(&store), vec!["saga_started"]);
}

#[tokio::test]
async fn process_commit_brackets_the_transaction() {
    let store = EmbeddedEventStore::new();
    let request = SagaRequest::new("r1", Scripted::succeeding(), Scripted::succeeding());

    let outcome = commit(&request, &store).await.unwrap();

    assert!(matches!(outcome, CommitOutcome::Completed));
    assert_eq!(kinds(&store), vec!["transaction_started", "transaction_ended"]);
}

#[tokio::test]
async fn failed_commit_leaves_the_abort_decision_to_the_policy() {
    let store = EmbeddedEventStore::new();
    let request = SagaRequest::new("r1", Scripted::failing(), Scripted::succeeding());

    let outcome = commit(&request, &store).await.unwrap();

    // Only the start is recorded; on replay this reads as a hanging or
    // retried transaction until an abort is recorded.
    assert!(matches!(outcome, CommitOutcome::Aborted(_)));
    assert_eq!(kinds(&store), vec!["transaction_started"]);
}

#[tokio::test]
async fn abort_records_the_failure_cause() {
    let store = EmbeddedEventStore::new();
    let request = SagaRequest::new("r1", Scripted::failing(), Scripted::succeeding());

    abort(&request, &Fault::new("scripted failure"), &store)
        .await
        .unwrap();

    let events = store.events().unwrap();
    match &events[0].event {
        SagaEvent::TransactionAborted { cause, .. } => {
            assert_eq!(cause, "scripted failure");
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn saga_end_commit_records_forward_termination() {
    let store = EmbeddedEventStore::new();
    let outcome = commit(&SagaRequest::saga_end(), &store).await.unwrap();

    assert!(matches!(outcome, CommitOutcome::Completed));
    let events = store.events().unwrap();
    assert!(matches!(
        events[0].event,
        SagaEvent::SagaEnded { aborted: false, .. }
    ));
}

#[tokio::test]
async fn process_compensate_brackets_the_compensation() {
    let store = EmbeddedEventStore::new();
    let request = SagaRequest::new("r1", Scripted::succeeding(), Scripted::succeeding());

    let outcome = compensate(&request, &store).await.unwrap();

    assert!(matches!(outcome, CompensateOutcome::Completed));
    assert_eq!(
        kinds(&store),
        vec!["compensation_started", "compensation_ended"]
    );
}

#[tokio::test]
async fn failed_compensation_leaves_started_event_unmatched() {
    let store = EmbeddedEventStore::new();
    let request = SagaRequest::new("r1", Scripted::succeeding(), Scripted::failing());

    let outcome = compensate(&request, &store).await.unwrap();

    assert!(matches!(outcome, CompensateOutcome::Failed(_)));
    assert_eq!(kinds(&store), vec!["compensation_started"]);
}

#[tokio::test]
async fn saga_start_compensate_records_backward_termination() {
    let store = EmbeddedEventStore::new();
    let outcome = compensate(&SagaRequest::saga_start(), &store)
        .await
        .unwrap();

    assert!(matches!(outcome, CompensateOutcome::Completed));
    let events = store.events().unwrap();
    assert!(matches!(
        events[0].event,
        SagaEvent::SagaEnded { aborted: true, .. }
    ));
}
