//! Scan-run lifecycle and pipeline orchestration.

pub mod orchestrator;
pub mod store;

pub use orchestrator::{ScanOrchestrator, ScanReport};
pub use store::{InMemoryScanStore, ScanRun, ScanStatus, ScanStore};
