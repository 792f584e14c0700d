//! Dispute session aggregate

use crate::escalation::{DisputeState, TransitionPlan};
use crate::examiner::Verdict;
use crate::ledger::ReplaySummary;
use crate::violation::{ResponseLayerViolation, Violation, ViolationRecord};
use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifier of a dispute thread
pub type DisputeId = String;

/// Kind of entity the dispute is raised against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    CreditBureau,
    DataFurnisher,
    DebtCollector,
}

/// One entity + consumer dispute thread.
///
/// Fields only change through the engine: transitions are applied from a
/// [`TransitionPlan`] after the ledger has acknowledged them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DisputeSession {
    pub(crate) id: DisputeId,
    pub(crate) entity_name: String,
    pub(crate) entity_type: EntityType,
    pub(crate) violations: Vec<ViolationRecord>,
    pub(crate) state: DisputeState,
    pub(crate) tier_reached: u8,
    pub(crate) tracking_started: bool,
    pub(crate) deadline: Option<NaiveDate>,
    pub(crate) filed_on: Option<NaiveDate>,
    /// Current dispute cycle (1-indexed)
    pub(crate) cycle: u32,
    /// Every state this dispute has entered
    pub(crate) states_entered: BTreeSet<DisputeState>,
    pub(crate) last_verdict: Option<Verdict>,
    /// Bumped on every committed mutation
    pub(crate) version: u64,
    pub(crate) created_at: DateTime<Utc>,
}

impl DisputeSession {
    /// Create a new dispute with a generated identifier
    pub fn new(entity_name: impl Into<String>, entity_type: EntityType) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), entity_name, entity_type)
    }

    pub fn with_id(
        id: impl Into<DisputeId>,
        entity_name: impl Into<String>,
        entity_type: EntityType,
    ) -> Self {
        let mut states_entered = BTreeSet::new();
        states_entered.insert(DisputeState::Detected);
        Self {
            id: id.into(),
            entity_name: entity_name.into(),
            entity_type,
            violations: Vec::new(),
            state: DisputeState::Detected,
            tier_reached: 0,
            tracking_started: false,
            deadline: None,
            filed_on: None,
            cycle: 1,
            states_entered,
            last_verdict: None,
            version: 0,
            created_at: Utc::now(),
        }
    }

    /// Attach a data-layer violation before the dispute is opened
    pub fn with_violation(mut self, violation: Violation) -> Self {
        self.violations.push(ViolationRecord::Data(violation));
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn violations(&self) -> &[ViolationRecord] {
        &self.violations
    }

    pub fn state(&self) -> DisputeState {
        self.state
    }

    pub fn tier_reached(&self) -> u8 {
        self.tier_reached
    }

    pub fn tracking_started(&self) -> bool {
        self.tracking_started
    }

    pub fn deadline(&self) -> Option<NaiveDate> {
        self.deadline
    }

    pub fn filed_on(&self) -> Option<NaiveDate> {
        self.filed_on
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    pub fn last_verdict(&self) -> Option<Verdict> {
        self.last_verdict
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn has_entered(&self, state: DisputeState) -> bool {
        self.states_entered.contains(&state)
    }

    pub fn is_locked(&self, threshold: u8) -> bool {
        self.tier_reached >= threshold
    }

    pub fn data_violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter_map(ViolationRecord::as_data)
    }

    pub fn response_layer_violations(&self) -> impl Iterator<Item = &ResponseLayerViolation> {
        self.violations.iter().filter_map(ViolationRecord::as_response)
    }

    pub fn find_violation(&self, id: &str) -> Option<&ViolationRecord> {
        self.violations.iter().find(|v| v.id() == id)
    }

    pub fn find_data_violation(&self, id: &str) -> Option<&Violation> {
        self.data_violations().find(|v| v.id == id)
    }

    pub(crate) fn push_violation(&mut self, record: ViolationRecord) {
        self.violations.push(record);
        self.version += 1;
    }

    /// Apply a plan the ledger has already acknowledged
    pub(crate) fn apply_transition(&mut self, plan: &TransitionPlan) {
        debug_assert_eq!(plan.from, self.state);
        for state in &plan.path {
            self.states_entered.insert(*state);
        }
        self.states_entered.insert(plan.to);
        self.state = plan.to;
        self.tier_reached = self.tier_reached.max(plan.tier_after);
        self.version += 1;
    }

    pub(crate) fn start_tracking(&mut self, filed_on: NaiveDate, deadline: NaiveDate, cycle: u32) {
        self.tracking_started = true;
        self.filed_on = Some(filed_on);
        self.deadline = Some(deadline);
        self.cycle = cycle;
    }

    pub(crate) fn record_verdict(&mut self, verdict: Verdict) {
        self.last_verdict = Some(verdict);
    }

    /// Engine-owned fields that differ from a just-constructed session
    pub(crate) fn derived_fields_set(&self) -> Vec<&'static str> {
        let mut set = Vec::new();
        if self.state != DisputeState::Detected {
            set.push("state");
        }
        if self.tier_reached != 0 {
            set.push("tier_reached");
        }
        if self.tracking_started {
            set.push("tracking_started");
        }
        if self.deadline.is_some() {
            set.push("deadline");
        }
        if self.filed_on.is_some() {
            set.push("filed_on");
        }
        if self.cycle != 1 {
            set.push("cycle");
        }
        if self.states_entered.len() != 1 || !self.states_entered.contains(&DisputeState::Detected) {
            set.push("states_entered");
        }
        if self.last_verdict.is_some() {
            set.push("last_verdict");
        }
        if self.version != 0 {
            set.push("version");
        }
        if self.response_layer_violations().next().is_some() {
            set.push("response-layer violations");
        }
        set
    }

    /// Rebuild ledger-derived fields on a freshly constructed session
    pub(crate) fn restore(&mut self, summary: &ReplaySummary) {
        self.violations.extend(
            summary
                .response_layer_violations
                .iter()
                .cloned()
                .map(ViolationRecord::Response),
        );
        self.state = summary.final_state;
        self.tier_reached = summary.tier_reached;
        self.states_entered = summary.states_entered.clone();
        self.tracking_started = summary.tracking_started();
        self.filed_on = summary.filed_on;
        self.deadline = summary.deadline;
        self.cycle = summary.cycle;
        self.last_verdict = summary.last_verdict;
        self.version = summary.entries as u64;
    }

    /// One-line summary for logging
    pub fn summary(&self) -> String {
        format!(
            "dispute={} entity={} state={} tier={} cycle={} violations={}",
            self.id,
            self.entity_name,
            self.state,
            self.tier_reached,
            self.cycle,
            self.violations.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::{Severity, ViolationEvidence, ViolationType};

    #[test]
    fn test_new_session_defaults() {
        let session = DisputeSession::new("Acme Bank", EntityType::DataFurnisher);
        assert_eq!(session.state(), DisputeState::Detected);
        assert_eq!(session.tier_reached(), 0);
        assert_eq!(session.cycle(), 1);
        assert!(!session.tracking_started());
        assert!(session.deadline().is_none());
        assert!(session.has_entered(DisputeState::Detected));
        assert!(uuid::Uuid::parse_str(session.id()).is_ok());
    }

    #[test]
    fn test_violation_lookup() {
        let session = DisputeSession::with_id("d-1", "Acme Bank", EntityType::DataFurnisher)
            .with_violation(Violation::new(
                "v-1",
                ViolationType::BalanceMismatch,
                Severity::Serious,
                ViolationEvidence::new("acme-1234", 20),
            ));
        assert!(session.find_data_violation("v-1").is_some());
        assert!(session.find_data_violation("v-2").is_none());
        assert_eq!(session.response_layer_violations().count(), 0);
    }

    #[test]
    fn test_apply_transition_tracks_tier_and_history() {
        let mut session = DisputeSession::with_id("d-1", "Acme Bank", EntityType::DataFurnisher);
        session.state = DisputeState::Disputed;
        let plan = TransitionPlan {
            from: DisputeState::Disputed,
            to: DisputeState::NonCompliant,
            path: vec![DisputeState::Responded, DisputeState::Evaluated],
            tier_before: 0,
            tier_after: 1,
        };
        session.apply_transition(&plan);

        assert_eq!(session.state(), DisputeState::NonCompliant);
        assert_eq!(session.tier_reached(), 1);
        assert!(session.has_entered(DisputeState::Evaluated));
        assert!(session.has_entered(DisputeState::NonCompliant));
        assert_eq!(session.version(), 1);
    }
}
