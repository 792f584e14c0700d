//! Entity responses: what the caller logs and what the ledger records

use crate::examiner::{ExaminerCheckResult, ExaminerStandard, Verdict};
use crate::violation::ViolationId;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How the entity answered a dispute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseType {
    /// Entity reports the item as verified accurate
    Verified,
    /// No reply received
    NoResponse,
    /// Dispute rejected as frivolous or irrelevant
    Rejected,
    /// Partial relief (e.g. balance adjusted, late marks removed)
    ReliefProvided,
    /// Item deleted
    Deleted,
    /// Item updated or corrected
    Updated,
}

impl ResponseType {
    /// Entity stood by the data or ignored the dispute
    pub fn left_uncorrected(&self) -> bool {
        matches!(self, Self::Verified | Self::NoResponse)
    }
}

impl std::fmt::Display for ResponseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified => write!(f, "VERIFIED"),
            Self::NoResponse => write!(f, "NO_RESPONSE"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::ReliefProvided => write!(f, "RELIEF_PROVIDED"),
            Self::Deleted => write!(f, "DELETED"),
            Self::Updated => write!(f, "UPDATED"),
        }
    }
}

/// Response as logged by the caller, before evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LoggedResponse {
    pub response_type: ResponseType,
    /// Date the response was received, or the date non-response was observed
    pub response_date: NaiveDate,
    /// Data-layer violation the dispute letter contested
    pub disputed_violation_id: ViolationId,
    /// Whether corrective evidence was sent to the entity
    #[serde(default)]
    pub evidence_sent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_sent_on: Option<NaiveDate>,
    /// Whether the contradiction still shows on the report pulled after the response
    #[serde(default)]
    pub contradiction_persists: bool,
}

impl LoggedResponse {
    pub fn new(
        response_type: ResponseType,
        response_date: NaiveDate,
        disputed_violation_id: impl Into<ViolationId>,
    ) -> Self {
        Self {
            response_type,
            response_date,
            disputed_violation_id: disputed_violation_id.into(),
            evidence_sent: false,
            evidence_sent_on: None,
            contradiction_persists: false,
        }
    }

    /// Corrective evidence went out with the dispute (date unknown)
    pub fn evidence_sent(mut self) -> Self {
        self.evidence_sent = true;
        self
    }

    /// Corrective evidence went out on `date`
    pub fn evidence_sent_on(mut self, date: NaiveDate) -> Self {
        self.evidence_sent = true;
        self.evidence_sent_on = Some(date);
        self
    }

    pub fn contradiction_persists(mut self, persists: bool) -> Self {
        self.contradiction_persists = persists;
        self
    }

    /// Evidence reached the entity on or before the response date
    pub fn evidence_preceded_response(&self) -> bool {
        self.evidence_sent
            && self
                .evidence_sent_on
                .map_or(true, |sent| sent <= self.response_date)
    }
}

/// Response as recorded in the ledger, with its examiner verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExecutionResponse {
    #[serde(flatten)]
    pub logged: LoggedResponse,
    pub standard_result: ExaminerStandard,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_layer_violation_id: Option<ViolationId>,
    #[serde(default)]
    pub escalation_basis: String,
}

impl ExecutionResponse {
    pub fn record(logged: LoggedResponse, check: &ExaminerCheckResult) -> Self {
        Self {
            logged,
            standard_result: check.standard_result.clone(),
            failure_reason: check.standard_result.reason().map(str::to_string),
            response_layer_violation_id: check.violation_payload.as_ref().map(|v| v.id.clone()),
            escalation_basis: check.escalation_basis.clone(),
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.standard_result.verdict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_evidence_timing() {
        let before = LoggedResponse::new(ResponseType::Verified, date(10), "v-1")
            .evidence_sent_on(date(1));
        assert!(before.evidence_preceded_response());

        let after = LoggedResponse::new(ResponseType::Verified, date(10), "v-1")
            .evidence_sent_on(date(20));
        assert!(!after.evidence_preceded_response());

        let undated = LoggedResponse::new(ResponseType::Verified, date(10), "v-1").evidence_sent();
        assert!(undated.evidence_preceded_response());

        let none = LoggedResponse::new(ResponseType::Verified, date(10), "v-1");
        assert!(!none.evidence_preceded_response());
    }

    #[test]
    fn test_recorded_response_flattens_input() {
        let logged = LoggedResponse::new(ResponseType::Rejected, date(3), "v-9");
        let recorded = ExecutionResponse::record(logged, &ExaminerCheckResult::pass());
        let json = serde_json::to_value(&recorded).unwrap();

        assert_eq!(json["response_type"], "REJECTED");
        assert_eq!(json["disputed_violation_id"], "v-9");
        assert_eq!(json["standard_result"]["result"], "PASS");
        assert!(json.get("failure_reason").is_none());
        assert_eq!(recorded.verdict(), Verdict::Pass);
    }

    #[test]
    fn test_left_uncorrected() {
        assert!(ResponseType::Verified.left_uncorrected());
        assert!(ResponseType::NoResponse.left_uncorrected());
        assert!(!ResponseType::Deleted.left_uncorrected());
        assert!(!ResponseType::ReliefProvided.left_uncorrected());
    }
}
