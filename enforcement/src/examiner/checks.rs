//! The four examiner checks as pure predicates
//!
//! No check looks at free text. Each one reads the logged response, the
//! disputed data-layer violation, and the session's violation sequence.

use crate::examiner::standard::{ExaminerCheck, ExaminerStandard};
use crate::response::{LoggedResponse, ResponseType};
use crate::session::DisputeSession;
use crate::violation::{Bureau, Severity, Violation};
use std::collections::BTreeSet;

/// Inputs shared by every check
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    pub session: &'a DisputeSession,
    pub response: &'a LoggedResponse,
    /// Data-layer violation the response answers
    pub disputed: &'a Violation,
}

impl<'a> CheckContext<'a> {
    pub fn new(
        session: &'a DisputeSession,
        response: &'a LoggedResponse,
        disputed: &'a Violation,
    ) -> Self {
        Self {
            session,
            response,
            disputed,
        }
    }

    /// Contradiction was on file before the entity answered
    pub fn previously_flagged(&self) -> bool {
        self.disputed.detected_at.date_naive() <= self.response.response_date
    }

    /// Statutory reply deadline had passed when non-response was observed
    pub fn deadline_passed(&self) -> bool {
        self.session
            .deadline()
            .map_or(false, |deadline| self.response.response_date > deadline)
    }

    /// Distinct bureaus reporting the disputed contradiction in the current cycle
    pub fn corroborating_bureaus(&self) -> BTreeSet<Bureau> {
        let key = self.disputed.contradiction_key();
        let cycle = self.session.cycle();
        self.session
            .data_violations()
            .filter(|v| v.evidence.cycle == cycle && v.contradiction_key() == key)
            .filter_map(|v| v.evidence.bureau)
            .collect()
    }
}

/// PERFUNCTORY_INVESTIGATION: verified a flagged, still-present contradiction
/// after receiving corrective evidence
pub fn perfunctory_investigation(ctx: &CheckContext<'_>) -> bool {
    ctx.response.response_type == ResponseType::Verified
        && ctx.previously_flagged()
        && ctx.response.contradiction_persists
        && ctx.response.evidence_preceded_response()
}

/// NOTICE_OF_RESULTS_FAILURE: no reply by the statutory deadline
pub fn notice_of_results_failure(ctx: &CheckContext<'_>) -> bool {
    ctx.response.response_type == ResponseType::NoResponse && ctx.deadline_passed()
}

/// SYSTEMIC_ACCURACY_FAILURE: the entity left uncorrected a contradiction
/// that two or more bureaus report independently in this cycle
pub fn systemic_accuracy_failure(ctx: &CheckContext<'_>) -> bool {
    ctx.response.response_type.left_uncorrected() && ctx.corroborating_bureaus().len() >= 2
}

/// UDAAP_MISLEADING_VERIFICATION: verified a critical logical impossibility
/// after receiving corrective evidence
pub fn udaap_misleading_verification(ctx: &CheckContext<'_>) -> bool {
    ctx.response.response_type == ResponseType::Verified
        && ctx.disputed.severity == Severity::Critical
        && ctx.disputed.is_logical_impossibility
        && ctx.response.evidence_preceded_response()
}

/// Run one check, returning its failure standard if it fires
pub fn run_check(check: ExaminerCheck, ctx: &CheckContext<'_>) -> Option<ExaminerStandard> {
    let violation_id = ctx.disputed.id.clone();
    let tradeline = &ctx.disputed.evidence.tradeline_key;
    let kind = ctx.disputed.violation_type;
    let date = ctx.response.response_date;

    match check {
        ExaminerCheck::PerfunctoryInvestigation => {
            perfunctory_investigation(ctx).then(|| ExaminerStandard::FailPerfunctory {
                reason: format!(
                    "{} verified {} on tradeline {} on {} although corrective evidence was sent and the contradiction persists",
                    ctx.session.entity_name(),
                    kind,
                    tradeline,
                    date
                ),
                violation_id,
            })
        }
        ExaminerCheck::NoticeOfResultsFailure => {
            let deadline = ctx.session.deadline()?;
            notice_of_results_failure(ctx).then(|| ExaminerStandard::FailNoResults {
                reason: format!(
                    "{} sent no results by the {} deadline (observed {})",
                    ctx.session.entity_name(),
                    deadline,
                    date
                ),
                violation_id,
                deadline,
            })
        }
        ExaminerCheck::SystemicAccuracyFailure => {
            if !systemic_accuracy_failure(ctx) {
                return None;
            }
            let bureaus: Vec<Bureau> = ctx.corroborating_bureaus().into_iter().collect();
            let names = bureaus
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            Some(ExaminerStandard::FailSystemic {
                reason: format!(
                    "{} on tradeline {} reported by {} bureaus ({}) in cycle {}",
                    kind,
                    tradeline,
                    bureaus.len(),
                    names,
                    ctx.session.cycle()
                ),
                violation_id,
                bureaus,
            })
        }
        ExaminerCheck::UdaapMisleadingVerification => {
            udaap_misleading_verification(ctx).then(|| ExaminerStandard::FailMisleading {
                reason: format!(
                    "{} verified a logically impossible CRITICAL {} on tradeline {} despite corrective evidence",
                    ctx.session.entity_name(),
                    kind,
                    tradeline
                ),
                violation_id,
            })
        }
    }
}
