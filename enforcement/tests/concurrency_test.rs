//! Per-dispute serialization under concurrent callers

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use enforcement::{
    Bureau, DisputeEngine, DisputeFiling, DisputeSession, DisputeState, EntityType,
    LoggedResponse, ResponseType, Severity, Verdict, Violation, ViolationEvidence, ViolationType,
};
use std::sync::Arc;
use std::thread;

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, day).unwrap()
}

fn session(id: &str) -> DisputeSession {
    DisputeSession::with_id(id, "Acme Bank", EntityType::DataFurnisher).with_violation(
        Violation::new(
            "v-1",
            ViolationType::BalanceMismatch,
            Severity::Serious,
            ViolationEvidence::new("acme-1234", 30).on_bureau(Bureau::Equifax),
        )
        .detected_at(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
    )
}

#[test]
fn test_concurrent_responses_on_one_dispute_stay_paired() {
    let engine = Arc::new(DisputeEngine::in_memory());
    let id = engine.open_dispute(session("busy-1")).unwrap();
    engine
        .file_dispute(&id, DisputeFiling::standard(d(1, 10)))
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let engine = Arc::clone(&engine);
            let id = id.clone();
            thread::spawn(move || {
                let date = d(2, 1) + Duration::days(n);
                engine
                    .log_response(&id, LoggedResponse::new(ResponseType::Updated, date, "v-1"))
                    .unwrap()
            })
        })
        .collect();

    let mut seqs: Vec<u64> = handles
        .into_iter()
        .map(|h| {
            let outcome = h.join().unwrap();
            assert_eq!(outcome.check.verdict(), Verdict::Pass);
            assert_eq!(outcome.transition_seq, outcome.response_seq + 1);
            outcome.response_seq
        })
        .collect();
    seqs.sort();

    // Filing is seq 1; each evaluation took two consecutive slots
    let expected: Vec<u64> = (0..8).map(|n| 2 + 2 * n).collect();
    assert_eq!(seqs, expected);

    let summary = engine.audit(&id).unwrap();
    assert_eq!(summary.entries, 17);
    assert_eq!(summary.responses, 8);
    assert_eq!(engine.session(&id).unwrap().version(), 9);
}

#[test]
fn test_disputes_progress_independently() {
    let engine = Arc::new(DisputeEngine::in_memory());

    let handles: Vec<_> = (0..6)
        .map(|n| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let id = engine.open_dispute(session(&format!("par-{}", n))).unwrap();
                engine
                    .file_dispute(&id, DisputeFiling::standard(d(1, 10)))
                    .unwrap();
                // Even disputes fail, odd ones pass
                let response = if n % 2 == 0 {
                    LoggedResponse::new(ResponseType::Verified, d(2, 1), "v-1")
                        .evidence_sent_on(d(1, 10))
                        .contradiction_persists(true)
                } else {
                    LoggedResponse::new(ResponseType::Deleted, d(2, 1), "v-1")
                };
                engine.log_response(&id, response).unwrap();
                id
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.dispute_ids().len(), 6);
    for n in 0..6 {
        let id = format!("par-{}", n);
        let snapshot = engine.session(&id).unwrap();
        let expected = if n % 2 == 0 {
            DisputeState::NonCompliant
        } else {
            DisputeState::Responded
        };
        assert_eq!(snapshot.state(), expected, "{}", id);
        assert_eq!(engine.history(&id).unwrap().len(), 3);
        // Response-layer ids are scoped per dispute
        if n % 2 == 0 {
            assert_eq!(
                snapshot.response_layer_violations().next().unwrap().id,
                format!("{}-RLV-001", id)
            );
        }
    }
}
