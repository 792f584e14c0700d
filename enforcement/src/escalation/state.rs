//! Dispute lifecycle states

use crate::response::ResponseType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a dispute
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeState {
    /// Contradiction found, not yet disputed
    Detected,
    /// Dispute letter sent, deadline tracking running
    Disputed,
    /// Entity replied
    Responded,
    /// Entity did not reply
    NoResponse,
    /// Reply run through the examiner checks
    Evaluated,
    /// Perfunctory investigation or missing notice of results
    NonCompliant,
    /// Procedural demand after continued non-compliance
    ProceduralEnforcement,
    /// Systemic inaccuracy or misleading verification
    SubstantiveEnforcement,
    /// Regulator complaint track
    RegulatoryEscalation,
    /// Case file ready for counsel
    LitigationReady,
    /// Entity deleted the disputed item
    ResolvedDeleted,
    /// Entity corrected the disputed item
    ResolvedCured,
}

impl DisputeState {
    /// No automatic transition leaves these
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ResolvedDeleted | Self::ResolvedCured | Self::LitigationReady
        )
    }

    /// First entry into one of these raises the dispute's tier
    pub fn raises_tier(&self) -> bool {
        matches!(
            self,
            Self::NonCompliant
                | Self::SubstantiveEnforcement
                | Self::RegulatoryEscalation
                | Self::LitigationReady
        )
    }

    /// States a logged response may be evaluated from
    pub fn accepts_response(&self) -> bool {
        !self.is_terminal() && *self != Self::Detected
    }

    /// Intake state a response passes through before evaluation
    pub fn intake_for(response_type: ResponseType) -> Self {
        match response_type {
            ResponseType::NoResponse => Self::NoResponse,
            _ => Self::Responded,
        }
    }
}

impl std::fmt::Display for DisputeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Detected => "DETECTED",
            Self::Disputed => "DISPUTED",
            Self::Responded => "RESPONDED",
            Self::NoResponse => "NO_RESPONSE",
            Self::Evaluated => "EVALUATED",
            Self::NonCompliant => "NON_COMPLIANT",
            Self::ProceduralEnforcement => "PROCEDURAL_ENFORCEMENT",
            Self::SubstantiveEnforcement => "SUBSTANTIVE_ENFORCEMENT",
            Self::RegulatoryEscalation => "REGULATORY_ESCALATION",
            Self::LitigationReady => "LITIGATION_READY",
            Self::ResolvedDeleted => "RESOLVED_DELETED",
            Self::ResolvedCured => "RESOLVED_CURED",
        };
        write!(f, "{}", name)
    }
}

/// How an entity resolved the disputed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Resolution {
    Deleted,
    Cured,
}

impl Resolution {
    pub fn target(&self) -> DisputeState {
        match self {
            Self::Deleted => DisputeState::ResolvedDeleted,
            Self::Cured => DisputeState::ResolvedCured,
        }
    }
}

/// Response-window length for a filed dispute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseWindow {
    /// 30 days
    #[default]
    Standard,
    /// 45 days, when the consumer supplied additional information
    Extended,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(DisputeState::ResolvedDeleted.is_terminal());
        assert!(DisputeState::ResolvedCured.is_terminal());
        assert!(DisputeState::LitigationReady.is_terminal());
        assert!(!DisputeState::SubstantiveEnforcement.is_terminal());
    }

    #[test]
    fn test_tier_bearing_states() {
        assert!(DisputeState::NonCompliant.raises_tier());
        assert!(DisputeState::SubstantiveEnforcement.raises_tier());
        assert!(DisputeState::RegulatoryEscalation.raises_tier());
        assert!(!DisputeState::ProceduralEnforcement.raises_tier());
        assert!(!DisputeState::Responded.raises_tier());
    }

    #[test]
    fn test_intake() {
        assert_eq!(
            DisputeState::intake_for(ResponseType::NoResponse),
            DisputeState::NoResponse
        );
        assert_eq!(
            DisputeState::intake_for(ResponseType::Verified),
            DisputeState::Responded
        );
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_string(&DisputeState::SubstantiveEnforcement).unwrap();
        assert_eq!(json, "\"SUBSTANTIVE_ENFORCEMENT\"");
        assert_eq!(
            DisputeState::NonCompliant.to_string(),
            "NON_COMPLIANT".to_string()
        );
    }
}
