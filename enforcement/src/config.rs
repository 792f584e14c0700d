//! Engine configuration

use crate::error::{EngineError, EngineResult};
use crate::escalation::{ResponseWindow, DEFAULT_LOCK_THRESHOLD};
use crate::violation::OBSOLESCENCE_DAYS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a [`DisputeEngine`](crate::engine::DisputeEngine)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tier at which a dispute freezes; may be lowered, never raised past 3
    pub lock_threshold: u8,

    /// Reporting age (days) at which a tradeline is obsolete
    pub obsolescence_days: i64,

    /// Standard reinvestigation window (days)
    pub response_window_days: i64,

    /// Window when the consumer supplied additional information (days)
    pub extended_window_days: i64,

    /// Directory for the file ledger; in-memory when unset
    pub ledger_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_threshold: DEFAULT_LOCK_THRESHOLD,
            obsolescence_days: OBSOLESCENCE_DAYS,
            response_window_days: 30,
            extended_window_days: 45,
            ledger_dir: None,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables over the defaults
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load a TOML file; missing keys keep their defaults
    pub fn from_toml_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EngineError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&raw)
            .map_err(|e| EngineError::config(format!("invalid {}: {}", path.display(), e)))
    }

    /// Apply `DISPUTE_*` environment variables; unparsable values are ignored
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("DISPUTE_LOCK_THRESHOLD") {
            if let Ok(n) = val.parse() {
                self.lock_threshold = n;
            }
        }
        if let Ok(val) = std::env::var("DISPUTE_OBSOLESCENCE_DAYS") {
            if let Ok(n) = val.parse() {
                self.obsolescence_days = n;
            }
        }
        if let Ok(val) = std::env::var("DISPUTE_RESPONSE_WINDOW_DAYS") {
            if let Ok(n) = val.parse() {
                self.response_window_days = n;
            }
        }
        if let Ok(val) = std::env::var("DISPUTE_EXTENDED_WINDOW_DAYS") {
            if let Ok(n) = val.parse() {
                self.extended_window_days = n;
            }
        }
        if let Ok(dir) = std::env::var("DISPUTE_LEDGER_DIR") {
            self.ledger_dir = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !(1..=DEFAULT_LOCK_THRESHOLD).contains(&self.lock_threshold) {
            return Err(EngineError::config(format!(
                "lock_threshold must be between 1 and {}, got {}",
                DEFAULT_LOCK_THRESHOLD, self.lock_threshold
            )));
        }
        if self.obsolescence_days <= 0 {
            return Err(EngineError::config("obsolescence_days must be positive"));
        }
        if self.response_window_days <= 0 {
            return Err(EngineError::config("response_window_days must be positive"));
        }
        if self.extended_window_days < self.response_window_days {
            return Err(EngineError::config(format!(
                "extended_window_days ({}) is shorter than response_window_days ({})",
                self.extended_window_days, self.response_window_days
            )));
        }
        Ok(())
    }

    pub fn window_days(&self, window: ResponseWindow) -> i64 {
        match window {
            ResponseWindow::Standard => self.response_window_days,
            ResponseWindow::Extended => self.extended_window_days,
        }
    }
}
