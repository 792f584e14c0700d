//! Engine error types
//!
//! Rule evaluation itself never fails: every valid input yields PASS or one
//! FAIL_* kind. The errors here cover malformed input, locked or finished
//! disputes, and storage failures underneath the ledger.

use crate::escalation::DisputeState;
use crate::ledger::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while evaluating or escalating a dispute
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed input, rejected before evaluation
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Dispute has reached the tier lock; nothing may change
    #[error("Dispute {dispute_id} is locked at tier {tier_reached} (lock threshold {threshold})")]
    LockedDispute {
        dispute_id: String,
        tier_reached: u8,
        threshold: u8,
    },

    /// Transition not permitted from the current state
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: DisputeState, to: DisputeState },

    /// Response and transition records out of step
    #[error("Consistency error: {message}")]
    Consistency { message: String },

    #[error("Dispute not found: {dispute_id}")]
    DisputeNotFound { dispute_id: String },

    #[error("Dispute already registered: {dispute_id}")]
    DuplicateDispute { dispute_id: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Dispute lock poisoned: {dispute_id}")]
    LockPoisoned { dispute_id: String },

    /// Storage failure; the operation did not happen
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn not_found(dispute_id: impl Into<String>) -> Self {
        Self::DisputeNotFound {
            dispute_id: dispute_id.into(),
        }
    }

    /// Retrying means re-running the whole operation, including evaluation
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Ledger(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::LockedDispute { .. } => "LOCKED_DISPUTE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Consistency { .. } => "CONSISTENCY_ERROR",
            Self::DisputeNotFound { .. } => "DISPUTE_NOT_FOUND",
            Self::DuplicateDispute { .. } => "DUPLICATE_DISPUTE",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::LockPoisoned { .. } => "LOCK_POISONED",
            Self::Ledger(_) => "LEDGER_ERROR",
        }
    }

    /// Render for UI consumption
    pub fn to_structured(&self) -> StructuredError {
        let recovery = match self {
            Self::Validation { .. } => "Fix the response fields and log it again",
            Self::LockedDispute { .. } => {
                "Dispute is frozen; continue through the regulatory or litigation track"
            }
            Self::InvalidTransition { .. } => "Check the dispute state before retrying",
            Self::Consistency { .. } => "Audit the dispute ledger before any further writes",
            Self::DisputeNotFound { .. } => "Open or restore the dispute first",
            Self::DuplicateDispute { .. } => "Use the existing dispute",
            Self::Config { .. } => "Correct the engine configuration",
            Self::LockPoisoned { .. } => "Restore the dispute from its ledger",
            Self::Ledger(_) => "Retry the operation; it has not been recorded",
        };

        let mut structured = StructuredError::new(self.code(), self.to_string(), recovery);
        match self {
            Self::LockedDispute {
                dispute_id,
                tier_reached,
                ..
            } => {
                structured = structured
                    .with_context("dispute_id", dispute_id.clone())
                    .with_context("tier_reached", *tier_reached);
            }
            Self::DisputeNotFound { dispute_id }
            | Self::DuplicateDispute { dispute_id }
            | Self::LockPoisoned { dispute_id } => {
                structured = structured.with_context("dispute_id", dispute_id.clone());
            }
            Self::InvalidTransition { from, to } => {
                structured = structured
                    .with_context("from", from.to_string())
                    .with_context("to", to.to_string());
            }
            _ => {}
        }
        if self.is_retryable() {
            structured = structured.retryable();
        }
        structured
    }
}

/// Structured error payload for UI and API callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code (e.g. "LOCKED_DISPUTE")
    pub code: String,

    pub message: String,

    /// What the caller should do next
    pub recovery_action: String,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,

    #[serde(default)]
    pub retryable: bool,
}

impl StructuredError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        recovery_action: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            recovery_action: recovery_action.into(),
            context: HashMap::new(),
            retryable: false,
        }
    }

    pub fn with_context(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for StructuredError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_dispute_structured() {
        let err = EngineError::LockedDispute {
            dispute_id: "d-1".to_string(),
            tier_reached: 3,
            threshold: 3,
        };
        let structured = err.to_structured();
        assert_eq!(structured.code, "LOCKED_DISPUTE");
        assert!(!structured.retryable);
        assert_eq!(structured.context["tier_reached"], 3);
        assert!(err.to_string().contains("locked at tier 3"));
    }

    #[test]
    fn test_ledger_io_is_retryable() {
        let err = EngineError::from(LedgerError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )));
        assert!(err.is_retryable());
        assert!(err.to_structured().retryable);
    }

    #[test]
    fn test_validation_not_retryable() {
        let err = EngineError::validation("disputed_violation_id is required");
        assert!(!err.is_retryable());
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
