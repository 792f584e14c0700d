//! Credit Dispute Enforcement Library
//!
//! Decides, deterministically, whether an entity's answer to a consumer
//! credit dispute meets the investigation standard, and escalates it when it
//! does not.
//!
//! # Pipeline
//!
//! ```text
//! LoggedResponse ──► ExaminerCheckService ──► verdict (+ response-layer violation)
//!                                                  │
//!                        EscalationStateMachine ◄──┘  plan next state, enforce tier lock
//!                                  │
//!                        ExecutionLedger  response + transition, one atomic batch
//!                                  │
//!                        DisputeSession   committed after the ledger acknowledges
//!                                  │
//!                        RemedySelector   remedy to demand, obsolescence recomputed
//! ```
//!
//! # Components
//!
//! - `examiner`: the four examiner checks (perfunctory investigation, notice
//!   of results, systemic accuracy, misleading verification)
//! - `violation`: data-layer violations and the response-layer factory
//! - `escalation`: dispute states, tiers and the lock
//! - `ledger`: append-only history with memory, file and RocksDB backends
//! - `remedy`: verdict and obsolescence remedies
//! - `engine`: [`DisputeEngine`], the per-dispute serialized entry point
//!
//! # Usage
//!
//! ```no_run
//! use enforcement::{DisputeEngine, DisputeFiling, DisputeSession, EntityType, LoggedResponse, ResponseType};
//! # fn main() -> enforcement::EngineResult<()> {
//! # use enforcement::{Severity, Violation, ViolationEvidence, ViolationType};
//! # let violation = Violation::new("v-1", ViolationType::BalanceMismatch, Severity::Serious, ViolationEvidence::new("acme-1234", 40));
//! # let sent = chrono::NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
//! # let answered = chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
//! let engine = DisputeEngine::in_memory();
//! let id = engine.open_dispute(
//!     DisputeSession::new("Acme Bank", EntityType::DataFurnisher).with_violation(violation),
//! )?;
//! engine.file_dispute(&id, DisputeFiling::standard(sent))?;
//! let outcome = engine.log_response(&id, LoggedResponse::new(ResponseType::Verified, answered, "v-1"))?;
//! println!("{} -> {}", outcome.check.verdict(), outcome.state);
//! # Ok(())
//! # }
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod examiner;
pub mod ledger;
pub mod remedy;
pub mod response;
pub mod session;
pub mod violation;

// Re-export key engine types
pub use config::EngineConfig;
pub use engine::{DisputeEngine, DisputeFiling, EvaluationOutcome};
pub use error::{EngineError, EngineResult, StructuredError};

// Re-export domain types
pub use escalation::{
    DisputeState, EscalationStateMachine, Resolution, ResponseWindow, TransitionPlan,
    DEFAULT_LOCK_THRESHOLD,
};
pub use examiner::{
    ExaminerCheck, ExaminerCheckResult, ExaminerCheckService, ExaminerStandard, Verdict,
};
pub use remedy::{RemedyCategory, RemedyPlan, RemedySelector, ViolationClassification};
pub use response::{ExecutionResponse, LoggedResponse, ResponseType};
pub use session::{DisputeId, DisputeSession, EntityType};
pub use violation::{
    Bureau, ResponseLayerViolation, ResponseLayerViolationFactory, Severity, Violation,
    ViolationEvidence, ViolationId, ViolationRecord, ViolationType, OBSOLESCENCE_DAYS,
};

// Re-export ledger types
pub use ledger::{
    ExecutionLedger, FileLedger, LedgerAudit, LedgerBackend, LedgerBody, LedgerEntry,
    LedgerError, MemoryLedger, ReplaySummary, StateTransition, TransitionTrigger,
};
#[cfg(feature = "rocksdb")]
pub use ledger::RocksLedger;
