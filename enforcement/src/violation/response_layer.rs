//! Response-layer violations and the factory that creates them
//!
//! A failed examiner check compounds the originating data-layer violation:
//! a new record is created with a promoted severity and a statute citation.
//! The originating violation is never touched.

use crate::examiner::{ExaminerCheck, ExaminerStandard};
use crate::violation::types::{Severity, Violation, ViolationId};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Violation committed by the entity in how it answered a dispute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseLayerViolation {
    pub id: ViolationId,
    /// Check that failed
    pub origin: ExaminerCheck,
    /// Data-layer violation this one compounds
    pub source_violation_id: ViolationId,
    pub severity: Severity,
    pub statute: String,
    pub reason: String,
    /// Date of the response that produced it
    pub response_date: NaiveDate,
}

impl ResponseLayerViolation {
    /// Escalation basis rendered for the ledger and letter generator
    pub fn escalation_basis(&self) -> String {
        format!(
            "{} [{}] under {}: {}",
            self.origin, self.severity, self.statute, self.reason
        )
    }
}

/// Builds response-layer violations from failed examiner standards
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseLayerViolationFactory;

impl ResponseLayerViolationFactory {
    /// Deterministic identifier for the `ordinal`-th response-layer violation of a dispute
    pub fn violation_id(dispute_id: &str, ordinal: usize) -> ViolationId {
        format!("{}-RLV-{:03}", dispute_id, ordinal)
    }

    /// Materialize the violation for a failed standard.
    ///
    /// Returns `None` for PASS.
    pub fn materialize(
        &self,
        id: ViolationId,
        standard: &ExaminerStandard,
        originating: &Violation,
        response_date: NaiveDate,
    ) -> Option<ResponseLayerViolation> {
        let origin = standard.check()?;
        let reason = standard.reason().unwrap_or_default().to_string();

        Some(ResponseLayerViolation {
            id,
            origin,
            source_violation_id: originating.id.clone(),
            severity: origin.promoted_severity(originating.severity),
            statute: origin.statute().to_string(),
            reason,
            response_date,
        })
    }
}
