//! Storage contract for the execution ledger, and the in-process backend

use crate::ledger::types::{LedgerBody, LedgerEntry, LedgerError, LedgerResult, TransitionTrigger};
use std::collections::HashMap;
use std::sync::RwLock;

/// Durable, ordered, append-only storage keyed by dispute id.
///
/// `append_batch` is all-or-nothing: after a crash either every entry of the
/// batch is readable or none is. Implementations must reject a batch that
/// does not continue the stored sequence exactly.
pub trait LedgerBackend: Send + Sync + std::fmt::Debug {
    fn append_batch(&self, dispute_id: &str, entries: &[LedgerEntry]) -> LedgerResult<()>;

    /// Full history in sequence order
    fn read(&self, dispute_id: &str) -> LedgerResult<Vec<LedgerEntry>>;

    /// Highest stored sequence number (0 when empty)
    fn head(&self, dispute_id: &str) -> LedgerResult<u64> {
        Ok(self.read(dispute_id)?.last().map_or(0, |entry| entry.seq))
    }
}

/// Check that `entries` continue a ledger whose head is `head`
pub fn check_batch(dispute_id: &str, head: u64, entries: &[LedgerEntry]) -> LedgerResult<()> {
    if entries.is_empty() {
        return Err(LedgerError::EmptyBatch {
            dispute_id: dispute_id.to_string(),
        });
    }

    for (offset, entry) in entries.iter().enumerate() {
        if entry.dispute_id != dispute_id {
            return Err(LedgerError::ForeignEntry {
                expected: dispute_id.to_string(),
                actual: entry.dispute_id.clone(),
            });
        }
        let expected = head + offset as u64 + 1;
        if entry.seq != expected {
            return Err(LedgerError::SequenceConflict {
                dispute_id: dispute_id.to_string(),
                expected,
                actual: entry.seq,
            });
        }
    }
    check_pairing(dispute_id, entries)
}

/// Every response is immediately followed by the evaluation transition that
/// names it, and every evaluation transition immediately follows its response
fn check_pairing(dispute_id: &str, entries: &[LedgerEntry]) -> LedgerResult<()> {
    let unpaired = |seq: u64, message: String| LedgerError::UnpairedEvaluation {
        dispute_id: dispute_id.to_string(),
        seq,
        message,
    };

    for (index, entry) in entries.iter().enumerate() {
        match &entry.body {
            LedgerBody::Response { response, .. } => {
                let next = entries.get(index + 1).and_then(LedgerEntry::as_transition);
                match next.map(|t| t.trigger) {
                    Some(TransitionTrigger::Evaluation {
                        response_seq,
                        verdict,
                    }) if response_seq == entry.seq && verdict == response.verdict() => {}
                    _ => {
                        return Err(unpaired(
                            entry.seq,
                            "response is not followed by its evaluation transition".to_string(),
                        ))
                    }
                }
            }
            LedgerBody::Transition(transition) => {
                if let TransitionTrigger::Evaluation { response_seq, .. } = transition.trigger {
                    let previous = index
                        .checked_sub(1)
                        .and_then(|i| entries.get(i))
                        .filter(|prev| prev.as_response().is_some());
                    if previous.map(|prev| prev.seq) != Some(response_seq) {
                        return Err(unpaired(
                            entry.seq,
                            format!("evaluation transition without response {}", response_seq),
                        ));
                    }
                }
            }
            LedgerBody::Correction(_) => {}
        }
    }
    Ok(())
}

/// Ledger held in process memory
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: RwLock<HashMap<String, Vec<LedgerEntry>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerBackend for MemoryLedger {
    fn append_batch(&self, dispute_id: &str, entries: &[LedgerEntry]) -> LedgerResult<()> {
        let mut all = self.entries.write().map_err(|_| LedgerError::LockPoisoned)?;
        let log = all.entry(dispute_id.to_string()).or_default();
        let head = log.last().map_or(0, |entry| entry.seq);
        check_batch(dispute_id, head, entries)?;
        log.extend_from_slice(entries);
        Ok(())
    }

    fn read(&self, dispute_id: &str) -> LedgerResult<Vec<LedgerEntry>> {
        let all = self.entries.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(all.get(dispute_id).cloned().unwrap_or_default())
    }

    fn head(&self, dispute_id: &str) -> LedgerResult<u64> {
        let all = self.entries.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(all
            .get(dispute_id)
            .and_then(|log| log.last())
            .map_or(0, |entry| entry.seq))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::escalation::DisputeState;
    use crate::examiner::{ExaminerCheckResult, Verdict};
    use crate::ledger::types::{Correction, StateTransition};
    use crate::response::{ExecutionResponse, LoggedResponse, ResponseType};
    use chrono::NaiveDate;

    pub(crate) fn response(seq: u64, dispute_id: &str) -> LedgerEntry {
        let logged = LoggedResponse::new(
            ResponseType::Deleted,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            "v-1",
        );
        LedgerEntry::new(
            seq,
            dispute_id,
            LedgerBody::Response {
                response: ExecutionResponse::record(logged, &ExaminerCheckResult::pass()),
                response_layer_violation: None,
            },
        )
    }

    pub(crate) fn evaluation_transition(seq: u64, dispute_id: &str, response_seq: u64) -> LedgerEntry {
        LedgerEntry::new(
            seq,
            dispute_id,
            LedgerBody::Transition(StateTransition {
                from: DisputeState::Disputed,
                to: DisputeState::Responded,
                path: vec![DisputeState::Responded, DisputeState::Evaluated],
                tier_before: 0,
                tier_after: 0,
                trigger: TransitionTrigger::Evaluation {
                    response_seq,
                    verdict: Verdict::Pass,
                },
            }),
        )
    }

    /// Batches a backend must refuse: a lone response, a lone evaluation
    /// transition, and a pair whose transition names another response
    pub(crate) fn unpaired_batches(dispute_id: &str, head: u64) -> Vec<Vec<LedgerEntry>> {
        vec![
            vec![response(head + 1, dispute_id)],
            vec![evaluation_transition(head + 1, dispute_id, head)],
            vec![
                response(head + 1, dispute_id),
                note(head + 2, dispute_id),
            ],
            vec![
                response(head + 1, dispute_id),
                evaluation_transition(head + 2, dispute_id, head + 5),
            ],
        ]
    }

    pub(crate) fn note(seq: u64, dispute_id: &str) -> LedgerEntry {
        LedgerEntry::new(
            seq,
            dispute_id,
            LedgerBody::Correction(Correction {
                corrects_seq: 1,
                note: format!("note {}", seq),
            }),
        )
    }

    #[test]
    fn test_memory_append_and_read() {
        let ledger = MemoryLedger::new();
        ledger
            .append_batch("d-1", &[note(1, "d-1"), note(2, "d-1")])
            .unwrap();
        ledger.append_batch("d-1", &[note(3, "d-1")]).unwrap();

        let entries = ledger.read("d-1").unwrap();
        assert_eq!(entries.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(ledger.head("d-1").unwrap(), 3);
        assert_eq!(ledger.head("d-2").unwrap(), 0);
    }

    #[test]
    fn test_rejected_batch_leaves_nothing() {
        let ledger = MemoryLedger::new();
        ledger.append_batch("d-1", &[note(1, "d-1")]).unwrap();

        // Second entry skips a sequence number
        let err = ledger
            .append_batch("d-1", &[note(2, "d-1"), note(4, "d-1")])
            .unwrap_err();
        assert!(matches!(err, LedgerError::SequenceConflict { expected: 3, actual: 4, .. }));
        assert_eq!(ledger.read("d-1").unwrap().len(), 1);

        assert!(matches!(
            ledger.append_batch("d-1", &[note(2, "d-9")]),
            Err(LedgerError::ForeignEntry { .. })
        ));
        assert!(matches!(
            ledger.append_batch("d-1", &[]),
            Err(LedgerError::EmptyBatch { .. })
        ));
    }

    #[test]
    fn test_memory_refuses_unpaired_evaluations() {
        let ledger = MemoryLedger::new();
        ledger.append_batch("d-1", &[note(1, "d-1")]).unwrap();

        for batch in unpaired_batches("d-1", 1) {
            let err = ledger.append_batch("d-1", &batch).unwrap_err();
            assert!(matches!(err, LedgerError::UnpairedEvaluation { .. }), "{:?}", err);
            assert!(!err.is_retryable());
        }
        assert_eq!(ledger.head("d-1").unwrap(), 1);

        ledger
            .append_batch(
                "d-1",
                &[response(2, "d-1"), evaluation_transition(3, "d-1", 2)],
            )
            .unwrap();
        assert_eq!(ledger.head("d-1").unwrap(), 3);
    }
}
