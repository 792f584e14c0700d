//! Data-layer violations as supplied by the contradiction detector
//!
//! These records are immutable inputs. Anything that depends on elapsed time
//! (reporting age, obsolescence) is derived here on demand from the freshness
//! evidence, never read back from a cached label.

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a violation (data-layer or response-layer)
pub type ViolationId = String;

/// FCRA §605(a) obsolescence horizon: seven years of reporting
pub const OBSOLESCENCE_DAYS: i64 = 2555;

/// Ordered severity scale
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Moderate,
    Serious,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::Serious => write!(f, "SERIOUS"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Consumer reporting agencies a tradeline can appear on
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bureau {
    Equifax,
    Experian,
    TransUnion,
}

impl std::fmt::Display for Bureau {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equifax => write!(f, "EQUIFAX"),
            Self::Experian => write!(f, "EXPERIAN"),
            Self::TransUnion => write!(f, "TRANSUNION"),
        }
    }
}

/// Contradiction classes produced by the detector
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationType {
    /// Reported balance disagrees with payment history or charge-off amount
    BalanceMismatch,
    /// Account status contradicts another field (e.g. paid but delinquent)
    StatusContradiction,
    /// Date of first delinquency moved or conflicts with other dates
    DofdConflict,
    /// Delinquency re-aged to extend the reporting period
    ReAging,
    /// Same debt reported more than once
    DuplicateTradeline,
    /// Data not refreshed for a long period
    StaleReporting,
    /// Furnisher cannot substantiate the data
    UnverifiableInformation,
    /// Reporting period exceeds the statutory obsolescence horizon
    ObsoleteAccount,
    /// Anything else the detector flags
    Other,
}

impl std::fmt::Display for ViolationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::BalanceMismatch => "BALANCE_MISMATCH",
            Self::StatusContradiction => "STATUS_CONTRADICTION",
            Self::DofdConflict => "DOFD_CONFLICT",
            Self::ReAging => "RE_AGING",
            Self::DuplicateTradeline => "DUPLICATE_TRADELINE",
            Self::StaleReporting => "STALE_REPORTING",
            Self::UnverifiableInformation => "UNVERIFIABLE_INFORMATION",
            Self::ObsoleteAccount => "OBSOLETE_ACCOUNT",
            Self::Other => "OTHER",
        };
        write!(f, "{}", name)
    }
}

/// Evidence captured by the detector for one violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ViolationEvidence {
    /// Stable identity of the tradeline (creditor + masked account number)
    pub tradeline_key: String,
    /// Bureau whose report carried the contradiction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bureau: Option<Bureau>,
    /// Dispute cycle the contradiction was detected in
    #[serde(default = "default_cycle")]
    pub cycle: u32,
    /// Days since the furnisher last updated the tradeline, as observed at detection
    pub days_since_update: i64,
    /// Date of the last furnisher update, when the report carried one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_on: Option<NaiveDate>,
    /// Raw report fields backing the contradiction
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, serde_json::Value>,
}

fn default_cycle() -> u32 {
    1
}

impl ViolationEvidence {
    pub fn new(tradeline_key: impl Into<String>, days_since_update: i64) -> Self {
        Self {
            tradeline_key: tradeline_key.into(),
            bureau: None,
            cycle: 1,
            days_since_update,
            last_updated_on: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn on_bureau(mut self, bureau: Bureau) -> Self {
        self.bureau = Some(bureau);
        self
    }

    pub fn in_cycle(mut self, cycle: u32) -> Self {
        self.cycle = cycle;
        self
    }

    pub fn last_updated(mut self, date: NaiveDate) -> Self {
        self.last_updated_on = Some(date);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Identity of a contradiction independent of which bureau reported it
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContradictionKey {
    pub violation_type: ViolationType,
    pub tradeline_key: String,
}

/// A data-layer violation (Tier 1 detector output)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Violation {
    pub id: ViolationId,
    /// Classification cached at detection time
    pub violation_type: ViolationType,
    pub severity: Severity,
    pub is_logical_impossibility: bool,
    pub evidence: ViolationEvidence,
    pub detected_at: DateTime<Utc>,
}

impl Violation {
    pub fn new(
        id: impl Into<ViolationId>,
        violation_type: ViolationType,
        severity: Severity,
        evidence: ViolationEvidence,
    ) -> Self {
        Self {
            id: id.into(),
            violation_type,
            severity,
            is_logical_impossibility: false,
            evidence,
            detected_at: Utc::now(),
        }
    }

    /// Mark as a logical impossibility (data that cannot be true as reported)
    pub fn impossible(mut self) -> Self {
        self.is_logical_impossibility = true;
        self
    }

    pub fn detected_at(mut self, at: DateTime<Utc>) -> Self {
        self.detected_at = at;
        self
    }

    pub fn contradiction_key(&self) -> ContradictionKey {
        ContradictionKey {
            violation_type: self.violation_type,
            tradeline_key: self.evidence.tradeline_key.clone(),
        }
    }

    /// Reporting age in days as of `as_of`.
    ///
    /// The freshness value observed at detection, aged by the days elapsed
    /// since detection. An explicit last-update date can only make the
    /// tradeline older, never younger.
    pub fn reporting_age_days(&self, as_of: NaiveDate) -> i64 {
        let elapsed = (as_of - self.detected_at.date_naive()).num_days().max(0);
        let observed = self.evidence.days_since_update.max(0).saturating_add(elapsed);
        match self.evidence.last_updated_on {
            Some(updated) => observed.max((as_of - updated).num_days()),
            None => observed,
        }
    }

    /// Whether the reporting age has reached the obsolescence horizon
    pub fn is_obsolete(&self, as_of: NaiveDate, threshold_days: i64) -> bool {
        self.reporting_age_days(as_of) >= threshold_days
    }

    /// Classification derived at `as_of`; obsolescence overrides the cached type
    pub fn effective_type(&self, as_of: NaiveDate, threshold_days: i64) -> ViolationType {
        if self.is_obsolete(as_of, threshold_days) {
            ViolationType::ObsoleteAccount
        } else {
            self.violation_type
        }
    }
}
