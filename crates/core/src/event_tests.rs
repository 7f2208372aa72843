use super::*;

#[test]
fn request_id_is_extracted_from_every_variant() {
    let events = [
        SagaEvent::SagaStarted {
            request_id: "saga-start".to_string(),
        },
        SagaEvent::TransactionStarted {
            request_id: "r1".to_string(),
        },
        SagaEvent::TransactionEnded {
            request_id: "r1".to_string(),
        },
        SagaEvent::TransactionAborted {
            request_id: "r1".to_string(),
            cause: "oops".to_string(),
        },
        SagaEvent::CompensationStarted {
            request_id: "r1".to_string(),
        },
        SagaEvent::CompensationEnded {
            request_id: "r1".to_string(),
        },
        SagaEvent::SagaEnded {
            request_id: "saga-end".to_string(),
            aborted: false,
        },
    ];

    let ids: Vec<&str> = events.iter().map(|e| e.request_id()).collect();
    assert_eq!(
        ids,
        vec!["saga-start", "r1", "r1", "r1", "r1", "r1", "saga-end"]
    );
}

#[test]
fn envelope_round_trips_through_json() {
    let envelope = EventEnvelope::new(
        3,
        SagaEvent::TransactionAborted {
            request_id: "r2".to_string(),
            cause: "connection refused".to_string(),
        },
    );

    let json = serde_json::to_string(&envelope).unwrap();
    let back: EventEnvelope = serde_json::from_str(&json).unwrap();
    assert_eq!(back, envelope);
}

#[test]
fn kind_tags_are_stable() {
    let event = SagaEvent::CompensationStarted {
        request_id: "r1".to_string(),
    };
    assert_eq!(event.kind(), "compensation_started");
}
