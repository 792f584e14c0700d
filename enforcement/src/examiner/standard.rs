//! Examiner standards, verdicts and check results

use crate::violation::{Bureau, ResponseLayerViolation, Severity, ViolationId};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The four statutory investigation-quality checks
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExaminerCheck {
    PerfunctoryInvestigation,
    NoticeOfResultsFailure,
    SystemicAccuracyFailure,
    UdaapMisleadingVerification,
}

impl ExaminerCheck {
    /// Evaluation order; also the tie-break order among equal-rank failures
    pub const ALL: [ExaminerCheck; 4] = [
        Self::PerfunctoryInvestigation,
        Self::NoticeOfResultsFailure,
        Self::SystemicAccuracyFailure,
        Self::UdaapMisleadingVerification,
    ];

    /// Statute citation attached to violations created by this check
    pub fn statute(&self) -> &'static str {
        match self {
            Self::PerfunctoryInvestigation => "FCRA §611(a)(1)(A); 15 U.S.C. §1681n",
            Self::NoticeOfResultsFailure => "FCRA §611(a)(6)(A)",
            Self::SystemicAccuracyFailure => "FCRA §607(b)",
            Self::UdaapMisleadingVerification => "FCRA §611(a)(1)(A)",
        }
    }

    /// Failure rank: SYSTEMIC = MISLEADING > PERFUNCTORY = NO_RESULTS
    pub fn rank(&self) -> u8 {
        match self {
            Self::SystemicAccuracyFailure | Self::UdaapMisleadingVerification => 2,
            Self::PerfunctoryInvestigation | Self::NoticeOfResultsFailure => 1,
        }
    }

    /// Severity a response-layer violation is promoted to, given the
    /// severity of the violation it originates from
    pub fn promoted_severity(&self, originating: Severity) -> Severity {
        match self {
            Self::SystemicAccuracyFailure | Self::UdaapMisleadingVerification => Severity::Critical,
            Self::PerfunctoryInvestigation | Self::NoticeOfResultsFailure => {
                originating.max(Severity::Serious)
            }
        }
    }

    pub fn verdict(&self) -> Verdict {
        match self {
            Self::PerfunctoryInvestigation => Verdict::FailPerfunctory,
            Self::NoticeOfResultsFailure => Verdict::FailNoResults,
            Self::SystemicAccuracyFailure => Verdict::FailSystemic,
            Self::UdaapMisleadingVerification => Verdict::FailMisleading,
        }
    }
}

impl std::fmt::Display for ExaminerCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PerfunctoryInvestigation => write!(f, "PERFUNCTORY_INVESTIGATION"),
            Self::NoticeOfResultsFailure => write!(f, "NOTICE_OF_RESULTS_FAILURE"),
            Self::SystemicAccuracyFailure => write!(f, "SYSTEMIC_ACCURACY_FAILURE"),
            Self::UdaapMisleadingVerification => write!(f, "UDAAP_MISLEADING_VERIFICATION"),
        }
    }
}

/// Payload-free verdict tag used by the transition and remedy tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    FailPerfunctory,
    FailNoResults,
    FailSystemic,
    FailMisleading,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::FailPerfunctory => write!(f, "FAIL_PERFUNCTORY"),
            Self::FailNoResults => write!(f, "FAIL_NO_RESULTS"),
            Self::FailSystemic => write!(f, "FAIL_SYSTEMIC"),
            Self::FailMisleading => write!(f, "FAIL_MISLEADING"),
        }
    }
}

/// Examiner standard result, one variant per verdict with its payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExaminerStandard {
    Pass,
    FailPerfunctory {
        reason: String,
        violation_id: ViolationId,
    },
    FailNoResults {
        reason: String,
        violation_id: ViolationId,
        deadline: NaiveDate,
    },
    FailSystemic {
        reason: String,
        violation_id: ViolationId,
        bureaus: Vec<Bureau>,
    },
    FailMisleading {
        reason: String,
        violation_id: ViolationId,
    },
}

impl ExaminerStandard {
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::Pass => Verdict::Pass,
            Self::FailPerfunctory { .. } => Verdict::FailPerfunctory,
            Self::FailNoResults { .. } => Verdict::FailNoResults,
            Self::FailSystemic { .. } => Verdict::FailSystemic,
            Self::FailMisleading { .. } => Verdict::FailMisleading,
        }
    }

    /// The check that produced this failure
    pub fn check(&self) -> Option<ExaminerCheck> {
        match self {
            Self::Pass => None,
            Self::FailPerfunctory { .. } => Some(ExaminerCheck::PerfunctoryInvestigation),
            Self::FailNoResults { .. } => Some(ExaminerCheck::NoticeOfResultsFailure),
            Self::FailSystemic { .. } => Some(ExaminerCheck::SystemicAccuracyFailure),
            Self::FailMisleading { .. } => Some(ExaminerCheck::UdaapMisleadingVerification),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Pass => None,
            Self::FailPerfunctory { reason, .. }
            | Self::FailNoResults { reason, .. }
            | Self::FailSystemic { reason, .. }
            | Self::FailMisleading { reason, .. } => Some(reason),
        }
    }

    /// Data-layer violation the failure is anchored to
    pub fn violation_id(&self) -> Option<&str> {
        match self {
            Self::Pass => None,
            Self::FailPerfunctory { violation_id, .. }
            | Self::FailNoResults { violation_id, .. }
            | Self::FailSystemic { violation_id, .. }
            | Self::FailMisleading { violation_id, .. } => Some(violation_id),
        }
    }
}

/// Outcome of evaluating one logged response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExaminerCheckResult {
    pub passed: bool,
    pub standard_result: ExaminerStandard,
    /// Response-layer violation created for a failure
    pub violation_payload: Option<ResponseLayerViolation>,
    pub escalation_eligible: bool,
    /// Every check that failed, in evaluation order
    pub failed_checks: Vec<ExaminerCheck>,
    /// Statutory basis for escalation; empty on PASS
    pub escalation_basis: String,
}

impl ExaminerCheckResult {
    pub fn pass() -> Self {
        Self {
            passed: true,
            standard_result: ExaminerStandard::Pass,
            violation_payload: None,
            escalation_eligible: false,
            failed_checks: Vec::new(),
            escalation_basis: String::new(),
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.standard_result.verdict()
    }
}
