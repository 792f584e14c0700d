//! Execution Ledger — append-only history per dispute
//!
//! The only writes are whole evaluations (response + transition in one
//! batch), single non-evaluation transitions, and corrections.

use crate::error::{EngineError, EngineResult};
use crate::escalation::TransitionPlan;
use crate::examiner::Verdict;
use crate::ledger::audit::{LedgerAudit, ReplaySummary};
use crate::ledger::backend::{LedgerBackend, MemoryLedger};
use crate::ledger::types::{Correction, LedgerBody, LedgerEntry, StateTransition, TransitionTrigger};
use crate::response::ExecutionResponse;
use crate::violation::ResponseLayerViolation;
use std::sync::Arc;

/// Shared handle to a storage backend
pub type SharedBackend = Arc<dyn LedgerBackend>;

#[derive(Debug, Clone)]
pub struct ExecutionLedger {
    backend: SharedBackend,
}

impl ExecutionLedger {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryLedger::new()))
    }

    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    /// Append a response and the transition it caused as one batch
    pub(crate) fn append_evaluation(
        &self,
        dispute_id: &str,
        response: ExecutionResponse,
        response_layer_violation: Option<ResponseLayerViolation>,
        plan: &TransitionPlan,
    ) -> EngineResult<(LedgerEntry, LedgerEntry)> {
        let head = self.backend.head(dispute_id)?;
        let verdict: Verdict = response.verdict();

        let response_entry = LedgerEntry::new(
            head + 1,
            dispute_id,
            LedgerBody::Response {
                response,
                response_layer_violation,
            },
        );
        let transition_entry = LedgerEntry::new(
            head + 2,
            dispute_id,
            LedgerBody::Transition(StateTransition::from_plan(
                plan,
                TransitionTrigger::Evaluation {
                    response_seq: head + 1,
                    verdict,
                },
            )),
        );

        self.backend.append_batch(
            dispute_id,
            &[response_entry.clone(), transition_entry.clone()],
        )?;

        tracing::debug!(
            dispute_id = %dispute_id,
            seq = head + 1,
            verdict = %verdict,
            "Appended evaluation"
        );
        Ok((response_entry, transition_entry))
    }

    /// Append a filing, advance or resolution transition
    pub(crate) fn append_transition(
        &self,
        dispute_id: &str,
        plan: &TransitionPlan,
        trigger: TransitionTrigger,
    ) -> EngineResult<LedgerEntry> {
        if matches!(trigger, TransitionTrigger::Evaluation { .. }) {
            return Err(EngineError::consistency(
                "evaluation transitions are only written together with their response",
            ));
        }

        let head = self.backend.head(dispute_id)?;
        let entry = LedgerEntry::new(
            head + 1,
            dispute_id,
            LedgerBody::Transition(StateTransition::from_plan(plan, trigger)),
        );
        self.backend.append_batch(dispute_id, std::slice::from_ref(&entry))?;

        tracing::debug!(
            dispute_id = %dispute_id,
            seq = entry.seq,
            from = %plan.from,
            to = %plan.to,
            "Appended transition"
        );
        Ok(entry)
    }

    /// Annotate an earlier entry of the same dispute
    pub fn append_correction(
        &self,
        dispute_id: &str,
        corrects_seq: u64,
        note: impl Into<String>,
    ) -> EngineResult<LedgerEntry> {
        let note = note.into();
        if note.trim().is_empty() {
            return Err(EngineError::validation("correction note is required"));
        }

        let head = self.backend.head(dispute_id)?;
        if corrects_seq == 0 || corrects_seq > head {
            return Err(EngineError::validation(format!(
                "dispute {} has no ledger entry {}",
                dispute_id, corrects_seq
            )));
        }

        let entry = LedgerEntry::new(
            head + 1,
            dispute_id,
            LedgerBody::Correction(Correction { corrects_seq, note }),
        );
        self.backend.append_batch(dispute_id, std::slice::from_ref(&entry))?;

        tracing::debug!(dispute_id = %dispute_id, seq = entry.seq, corrects_seq, "Appended correction");
        Ok(entry)
    }

    pub fn history(&self, dispute_id: &str) -> EngineResult<Vec<LedgerEntry>> {
        Ok(self.backend.read(dispute_id)?)
    }

    pub fn head(&self, dispute_id: &str) -> EngineResult<u64> {
        Ok(self.backend.head(dispute_id)?)
    }

    /// Replay and verify a dispute's full history
    pub fn audit(&self, dispute_id: &str) -> EngineResult<ReplaySummary> {
        let entries = self.history(dispute_id)?;
        LedgerAudit::replay(dispute_id, &entries)
    }
}
