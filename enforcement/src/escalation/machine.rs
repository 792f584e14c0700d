//! Escalation State Machine — deterministic transitions and tier locking
//!
//! Every method here is a pure planning step: it inspects the session and
//! returns a [`TransitionPlan`] (or refuses). Plans are applied to the
//! session only after the ledger has durably recorded them.

use crate::error::{EngineError, EngineResult};
use crate::escalation::state::{DisputeState, Resolution};
use crate::examiner::Verdict;
use crate::response::ResponseType;
use crate::session::DisputeSession;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default tier at which a dispute freezes
pub const DEFAULT_LOCK_THRESHOLD: u8 = 3;

/// A computed, not yet applied, state transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TransitionPlan {
    pub from: DisputeState,
    pub to: DisputeState,
    /// Intermediate states passed through between `from` and `to`
    pub path: Vec<DisputeState>,
    pub tier_before: u8,
    pub tier_after: u8,
}

impl TransitionPlan {
    pub fn raised_tier(&self) -> bool {
        self.tier_after > self.tier_before
    }
}

/// The Escalation State Machine
#[derive(Debug, Clone)]
pub struct EscalationStateMachine {
    lock_threshold: u8,
}

impl EscalationStateMachine {
    pub fn new(lock_threshold: u8) -> Self {
        Self { lock_threshold }
    }

    pub fn lock_threshold(&self) -> u8 {
        self.lock_threshold
    }

    /// Target state for a verdict leaving EVALUATED
    pub fn target_for(verdict: Verdict) -> DisputeState {
        match verdict {
            Verdict::Pass => DisputeState::Responded,
            Verdict::FailSystemic | Verdict::FailMisleading => DisputeState::SubstantiveEnforcement,
            Verdict::FailPerfunctory | Verdict::FailNoResults => DisputeState::NonCompliant,
        }
    }

    /// Edges available to a manual escalation
    pub fn can_advance(from: DisputeState, to: DisputeState) -> bool {
        use DisputeState::*;
        matches!(
            (from, to),
            (NonCompliant, ProceduralEnforcement)
                | (NonCompliant, RegulatoryEscalation)
                | (ProceduralEnforcement, RegulatoryEscalation)
                | (SubstantiveEnforcement, RegulatoryEscalation)
                | (RegulatoryEscalation, LitigationReady)
        )
    }

    /// Refuse any mutation once the tier lock is reached
    pub fn ensure_unlocked(&self, session: &DisputeSession) -> EngineResult<()> {
        if session.is_locked(self.lock_threshold) {
            tracing::warn!(
                dispute_id = %session.id(),
                tier = session.tier_reached(),
                state = %session.state(),
                "Refusing mutation of locked dispute"
            );
            return Err(EngineError::LockedDispute {
                dispute_id: session.id().to_string(),
                tier_reached: session.tier_reached(),
                threshold: self.lock_threshold,
            });
        }
        Ok(())
    }

    /// Plan the transition produced by evaluating a response.
    ///
    /// The dispute passes through the intake state (RESPONDED or NO_RESPONSE)
    /// and EVALUATED before landing on the verdict's target.
    pub fn plan_evaluation(
        &self,
        session: &DisputeSession,
        verdict: Verdict,
        response_type: ResponseType,
    ) -> EngineResult<TransitionPlan> {
        self.ensure_unlocked(session)?;

        let from = session.state();
        let intake = DisputeState::intake_for(response_type);
        if !from.accepts_response() {
            return Err(EngineError::InvalidTransition { from, to: intake });
        }

        let path = vec![intake, DisputeState::Evaluated];
        Ok(self.plan(session, Self::target_for(verdict), path))
    }

    /// Plan DETECTED → DISPUTED, or a re-dispute after a response
    pub fn plan_filing(&self, session: &DisputeSession) -> EngineResult<TransitionPlan> {
        self.ensure_unlocked(session)?;

        let from = session.state();
        match from {
            DisputeState::Detected | DisputeState::Responded | DisputeState::NoResponse => {
                Ok(self.plan(session, DisputeState::Disputed, Vec::new()))
            }
            _ => Err(EngineError::InvalidTransition {
                from,
                to: DisputeState::Disputed,
            }),
        }
    }

    /// Plan a manual escalation along a fixed edge
    pub fn plan_advance(
        &self,
        session: &DisputeSession,
        target: DisputeState,
    ) -> EngineResult<TransitionPlan> {
        self.ensure_unlocked(session)?;

        let from = session.state();
        if !Self::can_advance(from, target) {
            return Err(EngineError::InvalidTransition { from, to: target });
        }
        Ok(self.plan(session, target, Vec::new()))
    }

    /// Plan a resolution from any non-terminal state
    pub fn plan_resolution(
        &self,
        session: &DisputeSession,
        resolution: Resolution,
    ) -> EngineResult<TransitionPlan> {
        self.ensure_unlocked(session)?;

        let from = session.state();
        let to = resolution.target();
        if from.is_terminal() {
            return Err(EngineError::InvalidTransition { from, to });
        }
        Ok(self.plan(session, to, Vec::new()))
    }

    fn plan(
        &self,
        session: &DisputeSession,
        to: DisputeState,
        path: Vec<DisputeState>,
    ) -> TransitionPlan {
        let tier_before = session.tier_reached();
        let tier_after = if to.raises_tier() && !session.has_entered(to) {
            tier_before.saturating_add(1)
        } else {
            tier_before
        };

        TransitionPlan {
            from: session.state(),
            to,
            path,
            tier_before,
            tier_after,
        }
    }
}

impl Default for EscalationStateMachine {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_THRESHOLD)
    }
}
