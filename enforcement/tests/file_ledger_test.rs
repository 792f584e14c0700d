//! File-backed ledger: durability, restore and corruption detection

use chrono::{NaiveDate, TimeZone, Utc};
use enforcement::{
    Bureau, DisputeEngine, DisputeFiling, DisputeSession, DisputeState, EngineConfig,
    EngineError, EntityType, FileLedger, LedgerBackend, LoggedResponse, ResponseType, Severity,
    Verdict, Violation, ViolationEvidence, ViolationType,
};
use std::io::Write;
use std::path::Path;

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

fn perfunctory(date: NaiveDate) -> LoggedResponse {
    LoggedResponse::new(ResponseType::Verified, date, "v-1")
        .evidence_sent_on(d(1, 10))
        .contradiction_persists(true)
}

fn engine_at(dir: &Path) -> DisputeEngine {
    DisputeEngine::from_config(EngineConfig {
        ledger_dir: Some(dir.to_path_buf()),
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn test_history_survives_restart_and_restores_session() {
    let dir = tempfile::tempdir().unwrap();
    {
        let engine = engine_at(dir.path());
        engine.open_dispute(session("dur-1")).unwrap();
        engine
            .file_dispute("dur-1", DisputeFiling::standard(d(1, 10)))
            .unwrap();
        engine.log_response("dur-1", perfunctory(d(2, 1))).unwrap();
    }

    let engine = engine_at(dir.path());
    assert_eq!(engine.history("dur-1").unwrap().len(), 3);

    // Same id cannot be opened fresh over existing history
    assert!(matches!(
        engine.open_dispute(session("dur-1")),
        Err(EngineError::DuplicateDispute { .. })
    ));

    let summary = engine.restore_dispute(session("dur-1")).unwrap();
    assert_eq!(summary.final_state, DisputeState::NonCompliant);
    assert_eq!(summary.tier_reached, 1);
    assert_eq!(summary.deadline, Some(d(2, 9)));

    let restored = engine.session("dur-1").unwrap();
    assert_eq!(restored.state(), DisputeState::NonCompliant);
    assert_eq!(restored.last_verdict(), Some(Verdict::FailPerfunctory));
    assert!(restored.tracking_started());
    assert_eq!(restored.response_layer_violations().count(), 1);

    // Numbering continues from the restored response-layer violations
    let outcome = engine.log_response("dur-1", perfunctory(d(2, 20))).unwrap();
    assert_eq!(
        outcome.check.violation_payload.unwrap().id,
        "dur-1-RLV-002"
    );
    assert_eq!(outcome.response_seq, 4);
}

#[test]
fn test_one_line_per_evaluation() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_at(dir.path());
    engine.open_dispute(session("lines-1")).unwrap();
    engine
        .file_dispute("lines-1", DisputeFiling::standard(d(1, 10)))
        .unwrap();
    engine.log_response("lines-1", perfunctory(d(2, 1))).unwrap();

    let ledger = FileLedger::open(dir.path()).unwrap();
    let raw = std::fs::read_to_string(ledger.path_for("lines-1")).unwrap();
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines.len(), 2);

    // Response and transition share the evaluation's line
    let batch: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(batch.as_array().unwrap().len(), 2);
    assert_eq!(batch[0]["body"]["kind"], "RESPONSE");
    assert_eq!(batch[1]["body"]["kind"], "TRANSITION");
}

#[test]
fn test_torn_evaluation_is_invisible() {
    let dir = tempfile::tempdir().unwrap();
    {
        let engine = engine_at(dir.path());
        engine.open_dispute(session("torn-1")).unwrap();
        engine
            .file_dispute("torn-1", DisputeFiling::standard(d(1, 10)))
            .unwrap();
    }

    // Crash mid-way through writing an evaluation batch
    let ledger = FileLedger::open(dir.path()).unwrap();
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(ledger.path_for("torn-1"))
        .unwrap();
    file.write_all(br#"[{"seq":2,"dispute_id":"torn-1","recorded_at":"#)
        .unwrap();
    drop(file);

    let engine = engine_at(dir.path());
    let summary = engine.restore_dispute(session("torn-1")).unwrap();
    assert_eq!(summary.final_state, DisputeState::Disputed);
    assert_eq!(summary.responses, 0);

    let outcome = engine.log_response("torn-1", perfunctory(d(2, 1))).unwrap();
    assert_eq!(outcome.response_seq, 2);
    assert!(engine.audit("torn-1").is_ok());
}

#[test]
fn test_unpaired_response_on_disk_fails_restore() {
    let dir = tempfile::tempdir().unwrap();
    {
        let engine = engine_at(dir.path());
        engine.open_dispute(session("bad-1")).unwrap();
        engine
            .file_dispute("bad-1", DisputeFiling::standard(d(1, 10)))
            .unwrap();
        engine.log_response("bad-1", perfunctory(d(2, 1))).unwrap();
    }

    // Rewrite the evaluation line keeping only its response entry
    let ledger = FileLedger::open(dir.path()).unwrap();
    let path = ledger.path_for("bad-1");
    let raw = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = raw.lines().collect();
    let mut batch: Vec<serde_json::Value> = serde_json::from_str(lines[1]).unwrap();
    batch.truncate(1);
    std::fs::write(
        &path,
        format!("{}\n{}\n", lines[0], serde_json::to_string(&batch).unwrap()),
    )
    .unwrap();
    assert_eq!(ledger.read("bad-1").unwrap().len(), 2);

    let engine = engine_at(dir.path());
    let err = engine.restore_dispute(session("bad-1")).unwrap_err();
    assert!(matches!(err, EngineError::Consistency { .. }));
    assert_eq!(err.code(), "CONSISTENCY_ERROR");
    assert!(engine.session("bad-1").is_err());
}
