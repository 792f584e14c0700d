//! Ledger replay
//!
//! Walks a dispute's history from the beginning, checking every structural
//! guarantee the ledger makes and rebuilding the state it implies. Any
//! breach means the storage was corrupted outside the engine.

use crate::error::{EngineError, EngineResult};
use crate::escalation::{DisputeState, EscalationStateMachine};
use crate::examiner::Verdict;
use crate::ledger::types::{LedgerBody, LedgerEntry, TransitionTrigger};
use crate::violation::ResponseLayerViolation;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// State reconstructed from a consistent history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReplaySummary {
    pub dispute_id: String,
    pub entries: usize,
    pub responses: usize,
    pub transitions: usize,
    pub corrections: usize,
    pub final_state: DisputeState,
    pub tier_reached: u8,
    pub states_entered: BTreeSet<DisputeState>,
    pub cycle: u32,
    pub filed_on: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub last_verdict: Option<Verdict>,
    pub response_layer_violations: Vec<ResponseLayerViolation>,
}

impl ReplaySummary {
    fn empty(dispute_id: &str) -> Self {
        let mut states_entered = BTreeSet::new();
        states_entered.insert(DisputeState::Detected);
        Self {
            dispute_id: dispute_id.to_string(),
            entries: 0,
            responses: 0,
            transitions: 0,
            corrections: 0,
            final_state: DisputeState::Detected,
            tier_reached: 0,
            states_entered,
            cycle: 1,
            filed_on: None,
            deadline: None,
            last_verdict: None,
            response_layer_violations: Vec::new(),
        }
    }

    pub fn tracking_started(&self) -> bool {
        self.filed_on.is_some()
    }
}

pub struct LedgerAudit;

impl LedgerAudit {
    pub fn replay(dispute_id: &str, entries: &[LedgerEntry]) -> EngineResult<ReplaySummary> {
        let mut summary = ReplaySummary::empty(dispute_id);
        let mut pending_response: Option<(u64, Verdict)> = None;

        for (index, entry) in entries.iter().enumerate() {
            let expected = index as u64 + 1;
            if entry.seq != expected {
                return Err(breach(entry, format!("expected seq {}", expected)));
            }
            if entry.dispute_id != dispute_id {
                return Err(breach(entry, format!("belongs to dispute {}", entry.dispute_id)));
            }

            match &entry.body {
                LedgerBody::Response {
                    response,
                    response_layer_violation,
                } => {
                    if pending_response.is_some() {
                        return Err(breach(entry, "previous response has no transition"));
                    }
                    if response.response_layer_violation_id.as_ref()
                        != response_layer_violation.as_ref().map(|v| &v.id)
                    {
                        return Err(breach(entry, "response-layer violation id mismatch"));
                    }
                    pending_response = Some((entry.seq, response.verdict()));
                    if let Some(violation) = response_layer_violation {
                        summary.response_layer_violations.push(violation.clone());
                    }
                    summary.responses += 1;
                }
                LedgerBody::Transition(transition) => {
                    match (transition.trigger, pending_response.take()) {
                        (
                            TransitionTrigger::Evaluation {
                                response_seq,
                                verdict,
                            },
                            Some((seq, recorded)),
                        ) => {
                            if response_seq != seq || verdict != recorded {
                                return Err(breach(entry, "transition does not match its response"));
                            }
                            if transition.to != EscalationStateMachine::target_for(verdict) {
                                return Err(breach(entry, "target does not follow from verdict"));
                            }
                            summary.last_verdict = Some(verdict);
                        }
                        (TransitionTrigger::Evaluation { .. }, None) => {
                            return Err(breach(entry, "evaluation transition without response"));
                        }
                        (_, Some(_)) => {
                            return Err(breach(entry, "response followed by a non-evaluation transition"));
                        }
                        (TransitionTrigger::Filing { cycle, filed_on, deadline }, None) => {
                            summary.cycle = cycle;
                            summary.filed_on = Some(filed_on);
                            summary.deadline = Some(deadline);
                        }
                        (TransitionTrigger::Advance, None)
                        | (TransitionTrigger::Resolution { .. }, None) => {}
                    }

                    if transition.from != summary.final_state {
                        return Err(breach(
                            entry,
                            format!("starts at {} but dispute was {}", transition.from, summary.final_state),
                        ));
                    }
                    if transition.tier_before != summary.tier_reached
                        || transition.tier_after < transition.tier_before
                    {
                        return Err(breach(entry, "tier is not monotonic"));
                    }

                    summary.states_entered.extend(transition.path.iter().copied());
                    summary.states_entered.insert(transition.to);
                    summary.final_state = transition.to;
                    summary.tier_reached = transition.tier_after;
                    summary.transitions += 1;
                }
                LedgerBody::Correction(correction) => {
                    if pending_response.is_some() {
                        return Err(breach(entry, "previous response has no transition"));
                    }
                    if correction.corrects_seq == 0 || correction.corrects_seq >= entry.seq {
                        return Err(breach(
                            entry,
                            format!("corrects unknown seq {}", correction.corrects_seq),
                        ));
                    }
                    summary.corrections += 1;
                }
            }
            summary.entries += 1;
        }

        if let Some((seq, _)) = pending_response {
            return Err(EngineError::consistency(format!(
                "dispute {}: response at seq {} has no transition",
                dispute_id, seq
            )));
        }

        tracing::info!(
            dispute_id = %dispute_id,
            entries = summary.entries,
            state = %summary.final_state,
            tier = summary.tier_reached,
            "Ledger replay complete"
        );
        Ok(summary)
    }
}

fn breach(entry: &LedgerEntry, message: impl std::fmt::Display) -> EngineError {
    EngineError::consistency(format!(
        "dispute {} seq {} ({}): {}",
        entry.dispute_id,
        entry.seq,
        entry.kind(),
        message
    ))
}
