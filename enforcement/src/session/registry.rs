//! Dispute registry — per-dispute serialization
//!
//! Each session sits behind its own mutex. Work on one dispute is strictly
//! ordered; work on different disputes only contends on the brief map lookup.

use crate::error::{EngineError, EngineResult};
use crate::session::types::{DisputeId, DisputeSession};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Shared handle to one dispute
pub type SharedSession = Arc<Mutex<DisputeSession>>;

#[derive(Debug, Default)]
pub struct DisputeRegistry {
    sessions: RwLock<HashMap<DisputeId, SharedSession>>,
}

impl DisputeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: DisputeSession) -> EngineResult<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| EngineError::LockPoisoned {
                dispute_id: session.id().to_string(),
            })?;

        if sessions.contains_key(session.id()) {
            return Err(EngineError::DuplicateDispute {
                dispute_id: session.id().to_string(),
            });
        }
        sessions.insert(session.id().to_string(), Arc::new(Mutex::new(session)));
        Ok(())
    }

    pub fn get(&self, dispute_id: &str) -> EngineResult<SharedSession> {
        let sessions = self.sessions.read().map_err(|_| EngineError::LockPoisoned {
            dispute_id: dispute_id.to_string(),
        })?;
        sessions
            .get(dispute_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(dispute_id))
    }

    /// Remove a dispute unless it has reached the tier lock
    pub fn remove(&self, dispute_id: &str, lock_threshold: u8) -> EngineResult<DisputeSession> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| EngineError::LockPoisoned {
                dispute_id: dispute_id.to_string(),
            })?;

        let shared = sessions
            .get(dispute_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(dispute_id))?;
        let session = lock_session(&shared, dispute_id)?;

        if session.is_locked(lock_threshold) {
            return Err(EngineError::LockedDispute {
                dispute_id: dispute_id.to_string(),
                tier_reached: session.tier_reached(),
                threshold: lock_threshold,
            });
        }

        let removed = session.clone();
        drop(session);
        sessions.remove(dispute_id);
        Ok(removed)
    }

    pub fn ids(&self) -> Vec<DisputeId> {
        let mut ids: Vec<DisputeId> = self
            .sessions
            .read()
            .map(|sessions| sessions.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lock one dispute for the duration of an operation
pub fn lock_session<'a>(
    shared: &'a SharedSession,
    dispute_id: &str,
) -> EngineResult<MutexGuard<'a, DisputeSession>> {
    shared.lock().map_err(|_| EngineError::LockPoisoned {
        dispute_id: dispute_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::EntityType;

    #[test]
    fn test_insert_get_remove() {
        let registry = DisputeRegistry::new();
        registry
            .insert(DisputeSession::with_id(
                "d-1",
                "Acme",
                EntityType::DataFurnisher,
            ))
            .unwrap();

        assert!(registry.get("d-1").is_ok());
        assert!(matches!(
            registry.get("d-2"),
            Err(EngineError::DisputeNotFound { .. })
        ));

        let removed = registry.remove("d-1", 3).unwrap();
        assert_eq!(removed.id(), "d-1");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_rejected() {
        let registry = DisputeRegistry::new();
        let session = DisputeSession::with_id("d-1", "Acme", EntityType::DataFurnisher);
        registry.insert(session.clone()).unwrap();
        assert!(matches!(
            registry.insert(session),
            Err(EngineError::DuplicateDispute { .. })
        ));
    }

    #[test]
    fn test_locked_dispute_cannot_be_removed() {
        let registry = DisputeRegistry::new();
        let mut session = DisputeSession::with_id("d-1", "Acme", EntityType::CreditBureau);
        session.tier_reached = 3;
        registry.insert(session).unwrap();

        assert!(matches!(
            registry.remove("d-1", 3),
            Err(EngineError::LockedDispute { .. })
        ));
        assert_eq!(registry.len(), 1);
    }
}
