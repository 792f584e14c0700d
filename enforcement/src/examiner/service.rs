//! Examiner Check Service — evaluates one logged response
//!
//! All four checks run on every response. When several fail, the highest
//! ranked failure becomes the verdict; equal ranks resolve in evaluation
//! order.

use crate::error::{EngineError, EngineResult};
use crate::examiner::checks::{run_check, CheckContext};
use crate::examiner::standard::{ExaminerCheck, ExaminerCheckResult, ExaminerStandard};
use crate::response::LoggedResponse;
use crate::session::DisputeSession;
use crate::violation::{ResponseLayerViolationFactory, Violation, ViolationRecord};

#[derive(Debug, Default, Clone)]
pub struct ExaminerCheckService {
    factory: ResponseLayerViolationFactory,
}

impl ExaminerCheckService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject malformed responses before any check runs
    pub fn validate<'a>(
        &self,
        session: &'a DisputeSession,
        response: &LoggedResponse,
    ) -> EngineResult<&'a Violation> {
        if response.disputed_violation_id.trim().is_empty() {
            return Err(EngineError::validation("disputed_violation_id is required"));
        }

        if response.evidence_sent_on.is_some() && !response.evidence_sent {
            return Err(EngineError::validation(
                "evidence_sent_on is set but evidence_sent is false",
            ));
        }

        if let Some(filed) = session.filed_on() {
            if response.response_date < filed {
                return Err(EngineError::validation(format!(
                    "response_date {} precedes filing date {}",
                    response.response_date, filed
                )));
            }
        }

        match session.find_violation(&response.disputed_violation_id) {
            Some(ViolationRecord::Data(violation)) => Ok(violation),
            Some(ViolationRecord::Response(_)) => Err(EngineError::validation(format!(
                "violation {} is a response-layer violation and cannot be disputed",
                response.disputed_violation_id
            ))),
            None => Err(EngineError::validation(format!(
                "unknown violation {} for dispute {}",
                response.disputed_violation_id,
                session.id()
            ))),
        }
    }

    /// Evaluate a response against the session's current violations
    pub fn evaluate(
        &self,
        session: &DisputeSession,
        response: &LoggedResponse,
    ) -> EngineResult<ExaminerCheckResult> {
        let disputed = self.validate(session, response)?;
        let ctx = CheckContext::new(session, response, disputed);

        let failures: Vec<(ExaminerCheck, ExaminerStandard)> = ExaminerCheck::ALL
            .iter()
            .filter_map(|check| run_check(*check, &ctx).map(|standard| (*check, standard)))
            .collect();

        let failed_checks: Vec<ExaminerCheck> = failures.iter().map(|(check, _)| *check).collect();

        // Strictly-greater keeps the earliest check among equal ranks
        let winner = failures
            .into_iter()
            .fold(None, |best: Option<(ExaminerCheck, ExaminerStandard)>, candidate| {
                let replace = best
                    .as_ref()
                    .map_or(true, |(check, _)| candidate.0.rank() > check.rank());
                if replace {
                    Some(candidate)
                } else {
                    best
                }
            });

        let Some((check, standard)) = winner else {
            tracing::debug!(
                dispute_id = %session.id(),
                response_type = %response.response_type,
                "All examiner checks passed"
            );
            return Ok(ExaminerCheckResult::pass());
        };

        let ordinal = session.response_layer_violations().count() + 1;
        let violation = self.factory.materialize(
            ResponseLayerViolationFactory::violation_id(session.id(), ordinal),
            &standard,
            disputed,
            response.response_date,
        );
        let escalation_basis = violation
            .as_ref()
            .map(|v| v.escalation_basis())
            .unwrap_or_default();

        tracing::debug!(
            dispute_id = %session.id(),
            check = %check,
            failed = failed_checks.len(),
            "Examiner check failed"
        );

        Ok(ExaminerCheckResult {
            passed: false,
            standard_result: standard,
            violation_payload: violation,
            escalation_eligible: true,
            failed_checks,
            escalation_basis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::examiner::Verdict;
    use crate::response::ResponseType;
    use crate::session::EntityType;
    use crate::violation::{Bureau, Severity, ViolationEvidence, ViolationType};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn session() -> DisputeSession {
        let detected = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        DisputeSession::with_id("d-7", "Acme Bank", EntityType::DataFurnisher)
            .created_at(detected)
            .with_violation(
                Violation::new(
                    "v-1",
                    ViolationType::StatusContradiction,
                    Severity::Critical,
                    ViolationEvidence::new("acme-1234", 30).on_bureau(Bureau::Equifax),
                )
                .impossible()
                .detected_at(detected),
            )
            .with_violation(
                Violation::new(
                    "v-2",
                    ViolationType::StatusContradiction,
                    Severity::Critical,
                    ViolationEvidence::new("acme-1234", 30).on_bureau(Bureau::TransUnion),
                )
                .impossible()
                .detected_at(detected),
            )
    }

    #[test]
    fn test_blank_violation_id_is_validation_error() {
        let service = ExaminerCheckService::new();
        let response = LoggedResponse::new(ResponseType::Verified, date(3, 1), "  ");
        assert!(matches!(
            service.evaluate(&session(), &response),
            Err(EngineError::Validation { .. })
        ));
    }

    #[test]
    fn test_unknown_violation_is_validation_error() {
        let service = ExaminerCheckService::new();
        let response = LoggedResponse::new(ResponseType::Verified, date(3, 1), "v-404");
        assert!(matches!(
            service.evaluate(&session(), &response),
            Err(EngineError::Validation { .. })
        ));
    }

    #[test]
    fn test_undated_flag_with_date_is_validation_error() {
        let service = ExaminerCheckService::new();
        let mut response = LoggedResponse::new(ResponseType::Verified, date(3, 1), "v-1");
        response.evidence_sent_on = Some(date(2, 1));
        assert!(matches!(
            service.evaluate(&session(), &response),
            Err(EngineError::Validation { .. })
        ));
    }

    #[test]
    fn test_highest_rank_wins_with_table_order_tiebreak() {
        let service = ExaminerCheckService::new();
        let response = LoggedResponse::new(ResponseType::Verified, date(3, 1), "v-1")
            .evidence_sent_on(date(2, 1))
            .contradiction_persists(true);

        let result = service.evaluate(&session(), &response).unwrap();

        // Perfunctory, systemic and misleading all fire; systemic wins
        assert_eq!(
            result.failed_checks,
            vec![
                ExaminerCheck::PerfunctoryInvestigation,
                ExaminerCheck::SystemicAccuracyFailure,
                ExaminerCheck::UdaapMisleadingVerification,
            ]
        );
        assert_eq!(result.verdict(), Verdict::FailSystemic);
        assert!(!result.passed);
        assert!(result.escalation_eligible);

        let violation = result.violation_payload.unwrap();
        assert_eq!(violation.id, "d-7-RLV-001");
        assert_eq!(violation.severity, Severity::Critical);
        assert!(result.escalation_basis.contains("§607(b)"));
    }

    #[test]
    fn test_deleted_response_passes() {
        let service = ExaminerCheckService::new();
        let response = LoggedResponse::new(ResponseType::Deleted, date(3, 1), "v-1")
            .evidence_sent()
            .contradiction_persists(true);
        let result = service.evaluate(&session(), &response).unwrap();
        assert!(result.passed);
        assert!(result.failed_checks.is_empty());
    }
}
