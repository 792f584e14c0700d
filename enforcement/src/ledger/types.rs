//! Ledger entry types

use crate::escalation::{DisputeState, Resolution, TransitionPlan};
use crate::examiner::Verdict;
use crate::response::ExecutionResponse;
use crate::violation::ResponseLayerViolation;
use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Error type for ledger storage
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[cfg(feature = "rocksdb")]
    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),

    /// Batch does not continue the stored sequence
    #[error("Sequence conflict for {dispute_id}: expected seq {expected}, got {actual}")]
    SequenceConflict {
        dispute_id: String,
        expected: u64,
        actual: u64,
    },

    /// Entry belongs to another dispute
    #[error("Entry for {actual} appended to ledger of {expected}")]
    ForeignEntry { expected: String, actual: String },

    #[error("Empty batch for {dispute_id}")]
    EmptyBatch { dispute_id: String },

    /// Response and its evaluation transition must share one batch
    #[error("Unpaired evaluation entry for {dispute_id} at seq {seq}: {message}")]
    UnpairedEvaluation {
        dispute_id: String,
        seq: u64,
        message: String,
    },

    /// A complete record could not be decoded
    #[error("Corrupt ledger for {dispute_id}: {message}")]
    Corrupt { dispute_id: String, message: String },

    #[error("Ledger lock poisoned")]
    LockPoisoned,
}

impl LedgerError {
    /// Transient failures where re-running the operation can succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(_) | Self::SequenceConflict { .. } | Self::LockPoisoned => true,
            #[cfg(feature = "rocksdb")]
            Self::RocksDb(_) => true,
            _ => false,
        }
    }
}

/// Result type for ledger storage operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// One immutable ledger record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LedgerEntry {
    /// Per-dispute sequence number, starting at 1
    pub seq: u64,
    pub dispute_id: String,
    pub recorded_at: DateTime<Utc>,
    pub body: LedgerBody,
}

impl LedgerEntry {
    pub fn new(seq: u64, dispute_id: impl Into<String>, body: LedgerBody) -> Self {
        Self {
            seq,
            dispute_id: dispute_id.into(),
            recorded_at: Utc::now(),
            body,
        }
    }

    pub fn as_response(&self) -> Option<&ExecutionResponse> {
        match &self.body {
            LedgerBody::Response { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn as_transition(&self) -> Option<&StateTransition> {
        match &self.body {
            LedgerBody::Transition(transition) => Some(transition),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match &self.body {
            LedgerBody::Response { .. } => "RESPONSE",
            LedgerBody::Transition(_) => "TRANSITION",
            LedgerBody::Correction(_) => "CORRECTION",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerBody {
    /// Evaluated response; always followed by its transition
    Response {
        response: ExecutionResponse,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response_layer_violation: Option<ResponseLayerViolation>,
    },
    Transition(StateTransition),
    Correction(Correction),
}

/// A committed state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StateTransition {
    pub from: DisputeState,
    pub to: DisputeState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<DisputeState>,
    pub tier_before: u8,
    pub tier_after: u8,
    pub trigger: TransitionTrigger,
}

impl StateTransition {
    pub fn from_plan(plan: &TransitionPlan, trigger: TransitionTrigger) -> Self {
        Self {
            from: plan.from,
            to: plan.to,
            path: plan.path.clone(),
            tier_before: plan.tier_before,
            tier_after: plan.tier_after,
            trigger,
        }
    }

    pub fn to_plan(&self) -> TransitionPlan {
        TransitionPlan {
            from: self.from,
            to: self.to,
            path: self.path.clone(),
            tier_before: self.tier_before,
            tier_after: self.tier_after,
        }
    }
}

/// What caused a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionTrigger {
    /// Paired with the response entry at `response_seq`
    Evaluation { response_seq: u64, verdict: Verdict },
    Filing {
        cycle: u32,
        filed_on: NaiveDate,
        deadline: NaiveDate,
    },
    Advance,
    Resolution { resolution: Resolution },
}

/// Annotation of an earlier entry; the original stays untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Correction {
    pub corrects_seq: u64,
    pub note: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_wire_shape() {
        let entry = LedgerEntry::new(
            2,
            "d-1",
            LedgerBody::Transition(StateTransition {
                from: DisputeState::Disputed,
                to: DisputeState::NonCompliant,
                path: vec![DisputeState::Responded, DisputeState::Evaluated],
                tier_before: 0,
                tier_after: 1,
                trigger: TransitionTrigger::Evaluation {
                    response_seq: 1,
                    verdict: Verdict::FailPerfunctory,
                },
            }),
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["body"]["kind"], "TRANSITION");
        assert_eq!(json["body"]["to"], "NON_COMPLIANT");
        assert_eq!(json["body"]["trigger"]["type"], "EVALUATION");
        assert_eq!(json["body"]["trigger"]["verdict"], "FAIL_PERFUNCTORY");

        let back: LedgerEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
        assert_eq!(back.kind(), "TRANSITION");
    }

    #[test]
    fn test_storage_errors_retryable() {
        assert!(LedgerError::Io(std::io::Error::new(std::io::ErrorKind::Other, "x")).is_retryable());
        assert!(!LedgerError::Corrupt {
            dispute_id: "d".into(),
            message: "bad".into()
        }
        .is_retryable());
    }
}
