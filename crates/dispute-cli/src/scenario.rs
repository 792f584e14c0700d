//! Scenario files: a dispute, its violations, and the steps to run against it

use anyhow::{Context, Result};
use chrono::NaiveDate;
use enforcement::{
    DisputeEngine, DisputeFiling, DisputeSession, DisputeState, EntityType, LoggedResponse,
    Resolution, Violation,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub dispute: ScenarioDispute,
    #[serde(default)]
    pub violations: Vec<Violation>,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Date for the closing remedy plan; defaults to the last dated step
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioDispute {
    #[serde(default)]
    pub id: Option<String>,
    pub entity_name: String,
    pub entity_type: EntityType,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Step {
    File(DisputeFiling),
    Respond(LoggedResponse),
    Advance { target: DisputeState },
    Resolve { resolution: Resolution },
    Correct { corrects_seq: u64, note: String },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Self::File(_) => "FILE",
            Self::Respond(_) => "RESPOND",
            Self::Advance { .. } => "ADVANCE",
            Self::Resolve { .. } => "RESOLVE",
            Self::Correct { .. } => "CORRECT",
        }
    }

    fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::File(filing) => Some(filing.sent_on),
            Self::Respond(response) => Some(response.response_date),
            _ => None,
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing scenario {}", path.display()))
    }

    fn session(&self) -> DisputeSession {
        let session = match &self.dispute.id {
            Some(id) => DisputeSession::with_id(
                id.clone(),
                self.dispute.entity_name.clone(),
                self.dispute.entity_type,
            ),
            None => DisputeSession::new(self.dispute.entity_name.clone(), self.dispute.entity_type),
        };
        self.violations
            .iter()
            .cloned()
            .fold(session, DisputeSession::with_violation)
    }

    fn as_of(&self) -> Option<NaiveDate> {
        self.as_of
            .or_else(|| self.steps.iter().filter_map(Step::date).max())
    }
}

/// Run a scenario, returning one JSON report per step followed by the remedy plan.
///
/// Refused steps (locked dispute, invalid transition, bad input) are reported
/// in place and do not stop the run; storage failures do.
pub fn run(engine: &DisputeEngine, scenario: &Scenario) -> Result<Vec<Value>> {
    let session = scenario.session();
    let id = session.id().to_string();

    let resumed = engine.ledger().head(&id)? > 0;
    if resumed {
        let summary = engine.restore_dispute(session)?;
        info!(dispute_id = %id, state = %summary.final_state, "Resuming dispute from ledger");
    } else {
        engine.open_dispute(session)?;
    }

    let mut reports = Vec::with_capacity(scenario.steps.len() + 1);
    for (index, step) in scenario.steps.iter().enumerate() {
        let result = match step {
            Step::File(filing) => engine
                .file_dispute(&id, *filing)
                .map(|entry| json!({ "entry": entry })),
            Step::Respond(response) => engine
                .log_response(&id, response.clone())
                .map(|outcome| json!({ "outcome": outcome })),
            Step::Advance { target } => engine
                .advance(&id, *target)
                .map(|entry| json!({ "entry": entry })),
            Step::Resolve { resolution } => engine
                .resolve(&id, *resolution)
                .map(|entry| json!({ "entry": entry })),
            Step::Correct { corrects_seq, note } => engine
                .append_correction(&id, *corrects_seq, note.clone())
                .map(|entry| json!({ "entry": entry })),
        };

        let report = match result {
            Ok(body) => json!({ "step": index + 1, "action": step.name(), "ok": body }),
            Err(e) if e.is_retryable() => {
                return Err(e).with_context(|| format!("step {} ({})", index + 1, step.name()))
            }
            Err(e) => json!({
                "step": index + 1,
                "action": step.name(),
                "error": e.to_structured(),
            }),
        };
        reports.push(report);
    }

    let session = engine.session(&id)?;
    let mut closing = json!({
        "dispute_id": &id,
        "state": session.state(),
        "tier_reached": session.tier_reached(),
        "resumed": resumed,
    });
    if let Some(as_of) = scenario.as_of() {
        closing["remedy_plan"] = serde_json::to_value(engine.remedy_plan(&id, as_of)?)?;
    }
    reports.push(closing);
    Ok(reports)
}
