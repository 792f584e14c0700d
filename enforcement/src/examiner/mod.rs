//! Examiner Check Service — deterministic investigation-quality standards
//!
//! | Check                          | Fires when                                                        |
//! |--------------------------------|-------------------------------------------------------------------|
//! | PERFUNCTORY_INVESTIGATION      | VERIFIED, flagged earlier, still present, evidence sent before    |
//! | NOTICE_OF_RESULTS_FAILURE      | NO_RESPONSE after the statutory deadline                          |
//! | SYSTEMIC_ACCURACY_FAILURE      | uncorrected, same contradiction on ≥2 bureaus in this cycle       |
//! | UDAAP_MISLEADING_VERIFICATION  | VERIFIED a CRITICAL logical impossibility after evidence was sent |

pub mod checks;
pub mod service;
pub mod standard;

pub use checks::CheckContext;
pub use service::ExaminerCheckService;
pub use standard::{ExaminerCheck, ExaminerCheckResult, ExaminerStandard, Verdict};
