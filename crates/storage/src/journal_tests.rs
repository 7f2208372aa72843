use super::*;
use saga_core::{
    Compensation, Fault, GraphBuilder, Saga, SagaOutcome, SagaRequest, Transaction,
};
use async_trait::async_trait;
use std::sync::Arc;
use tempfile::TempDir;

fn make_journal() -> (Journal, TempDir) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("saga.jsonl");
    let journal = Journal::open(&path).unwrap();
    (journal, tmp)
}

fn started(request_id: &str) -> SagaEvent {
    SagaEvent::TransactionStarted {
        request_id: request_id.to_string(),
    }
}

#[test]
fn append_assigns_dense_ids() {
    let (journal, _tmp) = make_journal();

    let first = journal.append(started("r1")).unwrap();
    let second = journal.append(started("r2")).unwrap();

    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
    assert_eq!(journal.events().unwrap(), vec![first, second]);
}

#[test]
fn ids_resume_after_reopen() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("saga.jsonl");

    {
        let journal = Journal::open(&path).unwrap();
        journal.append(started("r1")).unwrap();
        journal.append(started("r2")).unwrap();
    }

    let journal = Journal::open(&path).unwrap();
    let next = journal.append(started("r3")).unwrap();
    assert_eq!(next.id, 3);

    let events = journal.events().unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].event.request_id(), "r1");
}

#[test]
fn populate_seeds_a_fresh_journal() {
    let (journal, _tmp) = make_journal();

    journal
        .populate(vec![
            EventEnvelope::new(1, started("r1")),
            EventEnvelope::new(2, started("r2")),
        ])
        .unwrap();

    let next = journal.append(started("r3")).unwrap();
    assert_eq!(next.id, 3);
    assert_eq!(journal.events().unwrap().len(), 3);
}

#[test]
fn populate_can_be_repeated_before_any_append() {
    let (journal, _tmp) = make_journal();

    journal
        .populate(vec![EventEnvelope::new(1, started("r1"))])
        .unwrap();
    journal
        .populate(vec![
            EventEnvelope::new(1, started("r9")),
            EventEnvelope::new(2, started("r10")),
        ])
        .unwrap();

    let events = journal.events().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event.request_id(), "r9");

    let next = journal.append(started("r11")).unwrap();
    assert_eq!(next.id, 3);
}

#[test]
fn populate_after_append_is_rejected() {
    let (journal, _tmp) = make_journal();
    journal.append(started("r1")).unwrap();

    let result = journal.populate(vec![EventEnvelope::new(1, started("r1"))]);
    assert!(matches!(result, Err(StoreError::PopulateAfterAppend)));
}

#[test]
fn populate_on_a_reopened_log_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("saga.jsonl");

    {
        let journal = Journal::open(&path).unwrap();
        journal.append(started("r1")).unwrap();
    }

    let journal = Journal::open(&path).unwrap();
    let result = journal.populate(vec![EventEnvelope::new(1, started("r1"))]);
    assert!(matches!(result, Err(StoreError::PopulateAfterAppend)));
}

#[test]
fn missing_file_reads_as_empty() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("saga.jsonl");
    let journal = Journal::open(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert!(journal.events().unwrap().is_empty());
}

struct Always;

#[async_trait]
impl Transaction for Always {
    async fn run(&self) -> Result<(), Fault> {
        Ok(())
    }
}

#[async_trait]
impl Compensation for Always {
    async fn run(&self) -> Result<(), Fault> {
        Ok(())
    }
}

fn process(id: &str) -> SagaRequest {
    SagaRequest::new(id, Arc::new(Always), Arc::new(Always))
}

fn linear() -> saga_core::SagaGraph {
    GraphBuilder::new()
        .node(0, SagaRequest::saga_start())
        .node(1, process("r1"))
        .node(2, process("r2"))
        .node(4, SagaRequest::saga_end())
        .edge(0, 1)
        .edge(1, 2)
        .edge(2, 4)
        .build()
        .unwrap()
}

#[tokio::test]
async fn saga_interrupted_mid_run_resumes_from_the_journal() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("saga.jsonl");

    // First incarnation dies after committing r1.
    {
        let journal = Journal::open(&path).unwrap();
        journal
            .append(SagaEvent::SagaStarted {
                request_id: "saga-start".to_string(),
            })
            .unwrap();
        journal.append(started("r1")).unwrap();
        journal
            .append(SagaEvent::TransactionEnded {
                request_id: "r1".to_string(),
            })
            .unwrap();
    }

    // Second incarnation replays and finishes the saga.
    let journal = Arc::new(Journal::open(&path).unwrap());
    let mut saga = Saga::new(
        Arc::clone(&journal) as Arc<dyn EventStore>,
        linear(),
    );
    saga.play().unwrap();
    let outcome = saga.run().await.unwrap();

    assert_eq!(outcome, SagaOutcome::Completed);
    let kinds: Vec<&str> = journal
        .events()
        .unwrap()
        .iter()
        .map(|e| e.event.kind())
        .collect();
    assert_eq!(
        kinds,
        vec![
            "saga_started",
            "transaction_started",
            "transaction_ended",
            "transaction_started",
            "transaction_ended",
            "saga_ended",
        ]
    );
}

#[tokio::test]
async fn completed_journal_replays_to_a_no_op() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("saga.jsonl");

    {
        let journal = Arc::new(Journal::open(&path).unwrap());
        let saga = Saga::new(Arc::clone(&journal) as Arc<dyn EventStore>, linear());
        assert_eq!(saga.run().await.unwrap(), SagaOutcome::Completed);
    }

    let journal = Arc::new(Journal::open(&path).unwrap());
    let before = journal.events().unwrap();

    let mut saga = Saga::new(Arc::clone(&journal) as Arc<dyn EventStore>, linear());
    saga.play().unwrap();
    assert_eq!(saga.run().await.unwrap(), SagaOutcome::Completed);
    assert_eq!(journal.events().unwrap(), before);
}
