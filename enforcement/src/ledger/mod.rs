//! Execution Ledger and its storage backends
//!
//! ```text
//! ExecutionLedger ──► dyn LedgerBackend
//!                       ├── MemoryLedger   (in-process)
//!                       ├── FileLedger     (JSON lines, one line per batch)
//!                       └── RocksLedger    (WriteBatch, `rocksdb` feature)
//! ```

pub mod audit;
pub mod backend;
pub mod execution;
pub mod file;
#[cfg(feature = "rocksdb")]
pub mod rocks;
pub mod types;

pub use audit::{LedgerAudit, ReplaySummary};
pub use backend::{LedgerBackend, MemoryLedger};
pub use execution::{ExecutionLedger, SharedBackend};
pub use file::FileLedger;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksLedger;
pub use types::{
    Correction, LedgerBody, LedgerEntry, LedgerError, LedgerResult, StateTransition,
    TransitionTrigger,
};
