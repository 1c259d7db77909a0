//! Scan-run records and their lifecycle.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreError;

/// Scan-run lifecycle status. `Running` is the only non-terminal state;
/// a run transitions out of it exactly once.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// Scan in progress.
    #[strum(serialize = "running")]
    Running,
    /// Scan finished and its counts are final.
    #[strum(serialize = "completed")]
    Completed,
    /// Scan aborted before producing results.
    #[strum(serialize = "failed")]
    Failed,
}

/// One scan-run record. Counts are written once, at finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRun {
    /// Run identifier.
    pub id: String,
    /// When the run started.
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    /// Lifecycle status.
    pub status: ScanStatus,
    /// Markets fetched and considered.
    pub markets_scanned: usize,
    /// Pairs surfaced after scoring.
    pub opportunities_found: usize,
    /// Surfaced pairs labeled high confidence.
    pub high_confidence_count: usize,
    /// When the run reached a terminal state.
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
}

impl ScanRun {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at: OffsetDateTime::now_utc(),
            status: ScanStatus::Running,
            markets_scanned: 0,
            opportunities_found: 0,
            high_confidence_count: 0,
            finished_at: None,
        }
    }
}

/// Persistence seam for scan runs.
pub trait ScanStore: Send + Sync {
    /// Create a new run in `Running` state.
    fn create_run(&self) -> ScanRun;

    /// Transition a run to `Completed` with its final counts. Fails if
    /// the run is unknown or already terminal.
    fn complete_run(
        &self,
        id: &str,
        markets_scanned: usize,
        opportunities_found: usize,
        high_confidence_count: usize,
    ) -> Result<ScanRun, StoreError>;

    /// Transition a run to `Failed`. Fails if the run is unknown or
    /// already terminal.
    fn fail_run(&self, id: &str) -> Result<ScanRun, StoreError>;

    /// Look up a run by id.
    fn get_run(&self, id: &str) -> Option<ScanRun>;

    /// All runs, newest first.
    fn list_runs(&self) -> Vec<ScanRun>;
}

/// In-memory scan store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryScanStore {
    runs: DashMap<String, ScanRun>,
}

impl InMemoryScanStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn finalize(
        &self,
        id: &str,
        apply: impl FnOnce(&mut ScanRun),
    ) -> Result<ScanRun, StoreError> {
        let mut entry = self
            .runs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        if entry.status != ScanStatus::Running {
            return Err(StoreError::InvalidTransition {
                id: id.to_string(),
                status: entry.status.to_string(),
            });
        }

        apply(&mut entry);
        entry.finished_at = Some(OffsetDateTime::now_utc());
        Ok(entry.clone())
    }
}

impl ScanStore for InMemoryScanStore {
    fn create_run(&self) -> ScanRun {
        let run = ScanRun::new();
        self.runs.insert(run.id.clone(), run.clone());
        run
    }

    fn complete_run(
        &self,
        id: &str,
        markets_scanned: usize,
        opportunities_found: usize,
        high_confidence_count: usize,
    ) -> Result<ScanRun, StoreError> {
        self.finalize(id, |run| {
            run.status = ScanStatus::Completed;
            run.markets_scanned = markets_scanned;
            run.opportunities_found = opportunities_found;
            run.high_confidence_count = high_confidence_count;
        })
    }

    fn fail_run(&self, id: &str) -> Result<ScanRun, StoreError> {
        self.finalize(id, |run| {
            run.status = ScanStatus::Failed;
        })
    }

    fn get_run(&self, id: &str) -> Option<ScanRun> {
        self.runs.get(id).map(|run| run.clone())
    }

    fn list_runs(&self) -> Vec<ScanRun> {
        let mut runs: Vec<ScanRun> = self.runs.iter().map(|run| run.clone()).collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn create_starts_running() {
        let store = InMemoryScanStore::new();
        let run = store.create_run();

        assert_eq!(run.status, ScanStatus::Running);
        assert!(run.finished_at.is_none());
        assert!(store.get_run(&run.id).is_some());
    }

    #[test]
    fn complete_records_counts() {
        let store = InMemoryScanStore::new();
        let run = store.create_run();

        let done = store.complete_run(&run.id, 42, 3, 1).unwrap();

        assert_eq!(done.status, ScanStatus::Completed);
        assert_eq!(done.markets_scanned, 42);
        assert_eq!(done.opportunities_found, 3);
        assert_eq!(done.high_confidence_count, 1);
        assert!(done.finished_at.is_some());
    }

    #[test]
    fn terminal_runs_refuse_further_transitions() {
        let store = InMemoryScanStore::new();
        let run = store.create_run();
        store.fail_run(&run.id).unwrap();

        assert!(matches!(
            store.complete_run(&run.id, 1, 0, 0),
            Err(StoreError::InvalidTransition { .. })
        ));
        assert!(matches!(
            store.fail_run(&run.id),
            Err(StoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn unknown_run_is_not_found() {
        let store = InMemoryScanStore::new();
        assert!(matches!(
            store.fail_run("missing"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn list_is_newest_first() {
        let store = InMemoryScanStore::new();
        let first = store.create_run();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = store.create_run();

        let runs = store.list_runs();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, second.id);
        assert_eq!(runs[1].id, first.id);
    }
}
