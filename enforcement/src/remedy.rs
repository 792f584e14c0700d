//! Remedy Selector
//!
//! Maps verdicts to the remedy a dispute letter demands, and reclassifies
//! obsolete tradelines at read time. Classification is recomputed on every
//! call from the evidence and `as_of`; nothing here is cached or stored.

use crate::examiner::Verdict;
use crate::session::DisputeSession;
use crate::violation::{Violation, ViolationId, ViolationType, OBSOLESCENCE_DAYS};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemedyCategory {
    /// Delete now; the entity's handling itself was unlawful
    ImmediateDeletion,
    /// Correct the data and document the reinvestigation
    CorrectionWithDocumentation,
    /// Delete as obsolete
    Deletion,
}

impl RemedyCategory {
    /// Strength of the demand (higher wins when several apply)
    pub fn rank(&self) -> u8 {
        match self {
            Self::ImmediateDeletion => 3,
            Self::Deletion => 2,
            Self::CorrectionWithDocumentation => 1,
        }
    }
}

impl std::fmt::Display for RemedyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ImmediateDeletion => write!(f, "IMMEDIATE_DELETION"),
            Self::CorrectionWithDocumentation => write!(f, "CORRECTION_WITH_DOCUMENTATION"),
            Self::Deletion => write!(f, "DELETION"),
        }
    }
}

/// A data-layer violation as classified at `as_of`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ViolationClassification {
    pub violation_id: ViolationId,
    /// Type recorded at detection
    pub cached_type: ViolationType,
    /// Type after obsolescence is applied
    pub effective_type: ViolationType,
    pub reporting_age_days: i64,
    pub obsolete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remedy: Option<RemedyCategory>,
}

/// Everything a letter for this dispute should demand, as of one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RemedyPlan {
    pub dispute_id: String,
    pub as_of: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_verdict: Option<Verdict>,
    /// Remedy driven by the latest verdict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict_remedy: Option<RemedyCategory>,
    pub classifications: Vec<ViolationClassification>,
    /// Strongest remedy across the verdict and every violation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<RemedyCategory>,
}

impl RemedyPlan {
    pub fn obsolete_violation_ids(&self) -> impl Iterator<Item = &str> {
        self.classifications
            .iter()
            .filter(|c| c.obsolete)
            .map(|c| c.violation_id.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RemedySelector {
    obsolescence_days: i64,
}

impl RemedySelector {
    pub fn new(obsolescence_days: i64) -> Self {
        Self { obsolescence_days }
    }

    pub fn obsolescence_days(&self) -> i64 {
        self.obsolescence_days
    }

    /// Remedy for an examiner verdict; PASS demands nothing further
    pub fn for_verdict(verdict: Verdict) -> Option<RemedyCategory> {
        match verdict {
            Verdict::Pass => None,
            Verdict::FailSystemic | Verdict::FailMisleading => Some(RemedyCategory::ImmediateDeletion),
            Verdict::FailPerfunctory | Verdict::FailNoResults => {
                Some(RemedyCategory::CorrectionWithDocumentation)
            }
        }
    }

    pub fn classify(&self, violation: &Violation, as_of: NaiveDate) -> ViolationClassification {
        let reporting_age_days = violation.reporting_age_days(as_of);
        let obsolete = reporting_age_days >= self.obsolescence_days;
        ViolationClassification {
            violation_id: violation.id.clone(),
            cached_type: violation.violation_type,
            effective_type: if obsolete {
                ViolationType::ObsoleteAccount
            } else {
                violation.violation_type
            },
            reporting_age_days,
            obsolete,
            remedy: obsolete.then_some(RemedyCategory::Deletion),
        }
    }

    /// Remedy for a violation given the verdict on it.
    ///
    /// Obsolescence wins over the verdict: an obsolete tradeline is demanded
    /// deleted whatever the entity did.
    pub fn for_violation(
        &self,
        violation: &Violation,
        verdict: Option<Verdict>,
        as_of: NaiveDate,
    ) -> Option<RemedyCategory> {
        if violation.is_obsolete(as_of, self.obsolescence_days) {
            return Some(RemedyCategory::Deletion);
        }
        verdict.and_then(Self::for_verdict)
    }

    pub fn plan(&self, session: &DisputeSession, as_of: NaiveDate) -> RemedyPlan {
        let last_verdict = session.last_verdict();
        let verdict_remedy = last_verdict.and_then(Self::for_verdict);
        let classifications: Vec<ViolationClassification> = session
            .data_violations()
            .map(|v| self.classify(v, as_of))
            .collect();

        let primary = classifications
            .iter()
            .filter_map(|c| c.remedy)
            .chain(verdict_remedy)
            .max_by_key(RemedyCategory::rank);

        RemedyPlan {
            dispute_id: session.id().to_string(),
            as_of,
            last_verdict,
            verdict_remedy,
            classifications,
            primary,
        }
    }
}

impl Default for RemedySelector {
    fn default() -> Self {
        Self::new(OBSOLESCENCE_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::EntityType;
    use crate::violation::{Severity, ViolationEvidence};
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn violation(id: &str, days_since_update: i64) -> Violation {
        Violation::new(
            id,
            ViolationType::BalanceMismatch,
            Severity::Serious,
            ViolationEvidence::new("acme-1234", days_since_update),
        )
        .detected_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_verdict_table() {
        assert_eq!(
            RemedySelector::for_verdict(Verdict::FailSystemic),
            Some(RemedyCategory::ImmediateDeletion)
        );
        assert_eq!(
            RemedySelector::for_verdict(Verdict::FailMisleading),
            Some(RemedyCategory::ImmediateDeletion)
        );
        assert_eq!(
            RemedySelector::for_verdict(Verdict::FailPerfunctory),
            Some(RemedyCategory::CorrectionWithDocumentation)
        );
        assert_eq!(
            RemedySelector::for_verdict(Verdict::FailNoResults),
            Some(RemedyCategory::CorrectionWithDocumentation)
        );
        assert_eq!(RemedySelector::for_verdict(Verdict::Pass), None);
    }

    #[test]
    fn test_obsolescence_boundary() {
        let selector = RemedySelector::default();
        let as_of = date(2024, 1, 1);

        let at = selector.classify(&violation("v-1", 2555), as_of);
        assert!(at.obsolete);
        assert_eq!(at.effective_type, ViolationType::ObsoleteAccount);
        assert_eq!(at.cached_type, ViolationType::BalanceMismatch);
        assert_eq!(at.remedy, Some(RemedyCategory::Deletion));

        let below = selector.classify(&violation("v-2", 2554), as_of);
        assert!(!below.obsolete);
        assert_eq!(below.remedy, None);
    }

    #[test]
    fn test_age_recomputed_at_read_time() {
        let selector = RemedySelector::default();
        let young = violation("v-1", 2550);

        assert!(!selector.classify(&young, date(2024, 1, 1)).obsolete);
        // Five days later the same evidence crosses the horizon
        assert!(selector.classify(&young, date(2024, 1, 6)).obsolete);
    }

    #[test]
    fn test_obsolescence_overrides_verdict() {
        let selector = RemedySelector::default();
        assert_eq!(
            selector.for_violation(
                &violation("v-1", 3000),
                Some(Verdict::FailPerfunctory),
                date(2024, 1, 1)
            ),
            Some(RemedyCategory::Deletion)
        );
    }

    #[test]
    fn test_plan_picks_strongest() {
        let selector = RemedySelector::default();
        let mut session = DisputeSession::with_id("d-1", "Acme", EntityType::DataFurnisher)
            .with_violation(violation("v-1", 3000))
            .with_violation(violation("v-2", 10));
        session.last_verdict = Some(Verdict::FailPerfunctory);

        let plan = selector.plan(&session, date(2024, 1, 1));
        assert_eq!(
            plan.verdict_remedy,
            Some(RemedyCategory::CorrectionWithDocumentation)
        );
        assert_eq!(plan.primary, Some(RemedyCategory::Deletion));
        assert_eq!(plan.obsolete_violation_ids().collect::<Vec<_>>(), vec!["v-1"]);
    }
}
