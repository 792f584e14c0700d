//! Dispute sessions and the registry that serializes work on them

pub mod registry;
pub mod types;

pub use registry::{lock_session, DisputeRegistry, SharedSession};
pub use types::{DisputeId, DisputeSession, EntityType};
