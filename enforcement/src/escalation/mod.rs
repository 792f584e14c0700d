//! Escalation State Machine — dispute lifecycle and tier locking
//!
//! All decisions are deterministic functions of the current state and the
//! examiner verdict; nothing here counts dispute attempts.
//!
//! # Lifecycle
//!
//! ```text
//! DETECTED ──file──▶ DISPUTED
//!                       │ response logged
//!                       ▼
//!              RESPONDED / NO_RESPONSE ──▶ EVALUATED
//!                                              │ verdict
//!        ┌──────────── PASS ───────────────────┤
//!        ▼                                     ├── PERFUNCTORY / NO_RESULTS ──▶ NON_COMPLIANT
//!    RESPONDED                                 └── SYSTEMIC / MISLEADING ─────▶ SUBSTANTIVE_ENFORCEMENT
//!
//! NON_COMPLIANT ──▶ PROCEDURAL_ENFORCEMENT
//! NON_COMPLIANT / PROCEDURAL / SUBSTANTIVE ──▶ REGULATORY_ESCALATION ──▶ LITIGATION_READY
//!
//! any non-terminal ──▶ RESOLVED_DELETED | RESOLVED_CURED
//! ```
//!
//! The first entry into NON_COMPLIANT, SUBSTANTIVE_ENFORCEMENT,
//! REGULATORY_ESCALATION or LITIGATION_READY raises the tier by one. At the
//! lock threshold (3) every further transition is refused.

pub mod machine;
pub mod state;

pub use machine::{EscalationStateMachine, TransitionPlan, DEFAULT_LOCK_THRESHOLD};
pub use state::{DisputeState, Resolution, ResponseWindow};
