//! Violations tracked against a dispute
//!
//! Two layers share one ordered sequence per dispute:
//!
//! ```text
//! Data layer      — contradictions found in the reported data (external input)
//!     │
//!     ▼ entity responds, examiner check fails
//! Response layer  — how the entity handled the dispute (created here)
//! ```
//!
//! Response-layer records compound their data-layer source; neither layer is
//! ever edited after it enters the sequence.

pub mod response_layer;
pub mod types;

pub use response_layer::{ResponseLayerViolation, ResponseLayerViolationFactory};
pub use types::{
    Bureau, ContradictionKey, Severity, Violation, ViolationEvidence, ViolationId, ViolationType,
    OBSOLESCENCE_DAYS,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One entry in a dispute's violation sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "layer", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationRecord {
    Data(Violation),
    Response(ResponseLayerViolation),
}

impl ViolationRecord {
    pub fn id(&self) -> &str {
        match self {
            Self::Data(v) => &v.id,
            Self::Response(v) => &v.id,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Data(v) => v.severity,
            Self::Response(v) => v.severity,
        }
    }

    pub fn as_data(&self) -> Option<&Violation> {
        match self {
            Self::Data(v) => Some(v),
            Self::Response(_) => None,
        }
    }

    pub fn as_response(&self) -> Option<&ResponseLayerViolation> {
        match self {
            Self::Data(_) => None,
            Self::Response(v) => Some(v),
        }
    }
}
