//! Dispute engine — the orchestration surface
//!
//! Every mutation follows the same order under the dispute's own lock:
//!
//! 1. Refuse if the dispute is tier-locked
//! 2. Validate input and run pure planning (checks, state machine)
//! 3. Append to the ledger and wait for the acknowledgement
//! 4. Apply the plan to the in-memory session
//!
//! A failure in steps 1–3 leaves both the session and the ledger untouched.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::escalation::{
    DisputeState, EscalationStateMachine, Resolution, ResponseWindow, TransitionPlan,
};
use crate::examiner::{ExaminerCheckResult, ExaminerCheckService};
use crate::ledger::{
    ExecutionLedger, FileLedger, LedgerEntry, MemoryLedger, ReplaySummary, SharedBackend,
    TransitionTrigger,
};
use crate::remedy::{RemedyCategory, RemedyPlan, RemedySelector};
use crate::response::{ExecutionResponse, LoggedResponse};
use crate::session::{lock_session, DisputeId, DisputeRegistry, DisputeSession};
use crate::violation::{Violation, ViolationRecord};
use chrono::{Duration, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A dispute letter going out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DisputeFiling {
    pub sent_on: NaiveDate,
    #[serde(default)]
    pub window: ResponseWindow,
}

impl DisputeFiling {
    pub fn standard(sent_on: NaiveDate) -> Self {
        Self {
            sent_on,
            window: ResponseWindow::Standard,
        }
    }

    pub fn extended(sent_on: NaiveDate) -> Self {
        Self {
            sent_on,
            window: ResponseWindow::Extended,
        }
    }
}

/// Result of logging one response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvaluationOutcome {
    pub dispute_id: DisputeId,
    pub check: ExaminerCheckResult,
    pub transition: TransitionPlan,
    pub response_seq: u64,
    pub transition_seq: u64,
    pub state: DisputeState,
    pub tier_reached: u8,
    /// Dispute is now frozen
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remedy: Option<RemedyCategory>,
}

#[derive(Debug)]
pub struct DisputeEngine {
    config: EngineConfig,
    machine: EscalationStateMachine,
    examiner: ExaminerCheckService,
    remedies: RemedySelector,
    ledger: ExecutionLedger,
    registry: DisputeRegistry,
}

impl DisputeEngine {
    pub fn new(config: EngineConfig, backend: SharedBackend) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self::assemble(config, backend))
    }

    /// Engine over a file ledger when `ledger_dir` is set, otherwise in memory
    pub fn from_config(config: EngineConfig) -> EngineResult<Self> {
        let backend: SharedBackend = match &config.ledger_dir {
            Some(dir) => Arc::new(FileLedger::open(dir)?),
            None => Arc::new(MemoryLedger::new()),
        };
        Self::new(config, backend)
    }

    /// Default configuration over a memory ledger
    pub fn in_memory() -> Self {
        Self::assemble(EngineConfig::default(), Arc::new(MemoryLedger::new()))
    }

    /// Wire the services from an already validated configuration
    fn assemble(config: EngineConfig, backend: SharedBackend) -> Self {
        Self {
            machine: EscalationStateMachine::new(config.lock_threshold),
            examiner: ExaminerCheckService::new(),
            remedies: RemedySelector::new(config.obsolescence_days),
            ledger: ExecutionLedger::new(backend),
            registry: DisputeRegistry::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &ExecutionLedger {
        &self.ledger
    }

    // =========================================================================
    // Dispute lifecycle
    // =========================================================================

    /// Register a new dispute with its data-layer violations
    pub fn open_dispute(&self, session: DisputeSession) -> EngineResult<DisputeId> {
        check_fresh(&session)?;
        if self.ledger.head(session.id())? > 0 {
            return Err(EngineError::DuplicateDispute {
                dispute_id: session.id().to_string(),
            });
        }

        let id = session.id().to_string();
        let violations = session.violations().len();
        self.registry.insert(session)?;
        info!(dispute_id = %id, violations, "Opened dispute");
        Ok(id)
    }

    /// Re-register a dispute from its ledger history.
    ///
    /// `session` carries the data-layer violations; everything else is
    /// rebuilt by replaying and auditing the ledger.
    pub fn restore_dispute(&self, mut session: DisputeSession) -> EngineResult<ReplaySummary> {
        check_fresh(&session)?;
        let summary = self.ledger.audit(session.id())?;
        session.restore(&summary);

        let id = session.id().to_string();
        self.registry.insert(session)?;
        info!(
            dispute_id = %id,
            state = %summary.final_state,
            tier = summary.tier_reached,
            "Restored dispute from ledger"
        );
        Ok(summary)
    }

    /// Add data-layer violations detected after the dispute was opened
    pub fn record_violations(
        &self,
        dispute_id: &str,
        violations: Vec<Violation>,
    ) -> EngineResult<usize> {
        let shared = self.registry.get(dispute_id)?;
        let mut session = lock_session(&shared, dispute_id)?;
        self.machine.ensure_unlocked(&session)?;

        let mut seen: HashSet<String> = session.violations().iter().map(|v| v.id().to_string()).collect();
        for violation in &violations {
            check_violation(violation, &mut seen)?;
        }

        let added = violations.len();
        for violation in violations {
            session.push_violation(ViolationRecord::Data(violation));
        }
        debug!(dispute_id = %dispute_id, added, "Recorded violations");
        Ok(added)
    }

    /// Send (or re-send) the dispute and start deadline tracking
    pub fn file_dispute(&self, dispute_id: &str, filing: DisputeFiling) -> EngineResult<LedgerEntry> {
        let shared = self.registry.get(dispute_id)?;
        let mut session = lock_session(&shared, dispute_id)?;
        let plan = self.machine.plan_filing(&session)?;

        if let Some(previous) = session.filed_on() {
            if filing.sent_on < previous {
                return Err(EngineError::validation(format!(
                    "filing date {} precedes previous filing {}",
                    filing.sent_on, previous
                )));
            }
        }

        let cycle = if session.tracking_started() {
            session.cycle() + 1
        } else {
            session.cycle()
        };
        let window = self.config.window_days(filing.window);
        let deadline = filing
            .sent_on
            .checked_add_signed(Duration::days(window))
            .ok_or_else(|| EngineError::validation("deadline out of range"))?;

        let entry = self.ledger.append_transition(
            dispute_id,
            &plan,
            TransitionTrigger::Filing {
                cycle,
                filed_on: filing.sent_on,
                deadline,
            },
        )?;

        session.apply_transition(&plan);
        session.start_tracking(filing.sent_on, deadline, cycle);
        info!(
            dispute_id = %dispute_id,
            cycle,
            deadline = %deadline,
            "Dispute filed"
        );
        Ok(entry)
    }

    /// Evaluate a logged response, record it, and escalate
    pub fn log_response(
        &self,
        dispute_id: &str,
        response: LoggedResponse,
    ) -> EngineResult<EvaluationOutcome> {
        let shared = self.registry.get(dispute_id)?;
        let mut session = lock_session(&shared, dispute_id)?;

        // Locked disputes refuse before any validation
        self.machine.ensure_unlocked(&session)?;

        let check = self.examiner.evaluate(&session, &response).map_err(|e| {
            warn!(dispute_id = %dispute_id, error = %e, "Rejected response");
            e
        })?;
        let verdict = check.verdict();
        let plan = self
            .machine
            .plan_evaluation(&session, verdict, response.response_type)?;

        let violation = check.violation_payload.clone();
        let record = ExecutionResponse::record(response, &check);
        let (response_entry, transition_entry) =
            self.ledger
                .append_evaluation(dispute_id, record, violation.clone(), &plan)?;

        if let Some(violation) = violation {
            session.push_violation(ViolationRecord::Response(violation));
        }
        session.apply_transition(&plan);
        session.record_verdict(verdict);

        let locked = session.is_locked(self.config.lock_threshold);
        info!(
            dispute_id = %dispute_id,
            verdict = %verdict,
            from = %plan.from,
            to = %plan.to,
            tier = session.tier_reached(),
            "Response evaluated"
        );
        if locked && plan.raised_tier() {
            warn!(dispute_id = %dispute_id, tier = session.tier_reached(), "Dispute reached tier lock");
        }

        Ok(EvaluationOutcome {
            dispute_id: dispute_id.to_string(),
            remedy: RemedySelector::for_verdict(verdict),
            check,
            response_seq: response_entry.seq,
            transition_seq: transition_entry.seq,
            state: session.state(),
            tier_reached: session.tier_reached(),
            locked,
            transition: plan,
        })
    }

    /// Manually escalate along a fixed edge
    pub fn advance(&self, dispute_id: &str, target: DisputeState) -> EngineResult<LedgerEntry> {
        let shared = self.registry.get(dispute_id)?;
        let mut session = lock_session(&shared, dispute_id)?;
        let plan = self.machine.plan_advance(&session, target)?;

        let entry = self
            .ledger
            .append_transition(dispute_id, &plan, TransitionTrigger::Advance)?;
        session.apply_transition(&plan);

        info!(
            dispute_id = %dispute_id,
            from = %plan.from,
            to = %plan.to,
            tier = session.tier_reached(),
            "Dispute advanced"
        );
        if session.is_locked(self.config.lock_threshold) && plan.raised_tier() {
            warn!(dispute_id = %dispute_id, tier = session.tier_reached(), "Dispute reached tier lock");
        }
        Ok(entry)
    }

    pub fn resolve(&self, dispute_id: &str, resolution: Resolution) -> EngineResult<LedgerEntry> {
        let shared = self.registry.get(dispute_id)?;
        let mut session = lock_session(&shared, dispute_id)?;
        let plan = self.machine.plan_resolution(&session, resolution)?;

        let entry = self.ledger.append_transition(
            dispute_id,
            &plan,
            TransitionTrigger::Resolution { resolution },
        )?;
        session.apply_transition(&plan);

        info!(dispute_id = %dispute_id, to = %plan.to, "Dispute resolved");
        Ok(entry)
    }

    /// Annotate an earlier ledger entry; the original is never rewritten
    pub fn append_correction(
        &self,
        dispute_id: &str,
        corrects_seq: u64,
        note: impl Into<String>,
    ) -> EngineResult<LedgerEntry> {
        let shared = self.registry.get(dispute_id)?;
        let _session = lock_session(&shared, dispute_id)?;
        self.ledger.append_correction(dispute_id, corrects_seq, note)
    }

    /// Drop a dispute from the registry; its ledger history stays
    pub fn remove_dispute(&self, dispute_id: &str) -> EngineResult<DisputeSession> {
        let removed = self.registry.remove(dispute_id, self.config.lock_threshold)?;
        info!(dispute_id = %dispute_id, "Removed dispute");
        Ok(removed)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Snapshot of a dispute
    pub fn session(&self, dispute_id: &str) -> EngineResult<DisputeSession> {
        let shared = self.registry.get(dispute_id)?;
        let session = lock_session(&shared, dispute_id)?;
        Ok(session.clone())
    }

    pub fn dispute_ids(&self) -> Vec<DisputeId> {
        self.registry.ids()
    }

    pub fn history(&self, dispute_id: &str) -> EngineResult<Vec<LedgerEntry>> {
        self.ledger.history(dispute_id)
    }

    pub fn audit(&self, dispute_id: &str) -> EngineResult<ReplaySummary> {
        self.ledger.audit(dispute_id)
    }

    /// Remedies to demand as of `as_of`, with obsolescence recomputed
    pub fn remedy_plan(&self, dispute_id: &str, as_of: NaiveDate) -> EngineResult<RemedyPlan> {
        let session = self.session(dispute_id)?;
        Ok(self.remedies.plan(&session, as_of))
    }
}

/// Sessions handed to the engine must not carry engine-derived state
fn check_fresh(session: &DisputeSession) -> EngineResult<()> {
    if session.id().trim().is_empty() {
        return Err(EngineError::validation("dispute id is required"));
    }
    let derived = session.derived_fields_set();
    if !derived.is_empty() {
        return Err(EngineError::validation(format!(
            "dispute {} carries engine-derived fields: {}",
            session.id(),
            derived.join(", ")
        )));
    }

    let mut seen = HashSet::new();
    for violation in session.data_violations() {
        check_violation(violation, &mut seen)?;
    }
    Ok(())
}

fn check_violation(violation: &Violation, seen: &mut HashSet<String>) -> EngineResult<()> {
    let id = violation.id.as_str();
    if id.trim().is_empty() {
        return Err(EngineError::validation("violation id is required"));
    }
    if violation.evidence.days_since_update < 0 {
        return Err(EngineError::validation(format!(
            "violation {} has negative days_since_update ({})",
            id, violation.evidence.days_since_update
        )));
    }
    if !seen.insert(id.to_string()) {
        return Err(EngineError::validation(format!("duplicate violation id {}", id)));
    }
    Ok(())
}
