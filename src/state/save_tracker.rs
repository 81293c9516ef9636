//! Save bookkeeping per image case.
//!
//! A save for a case is "in flight" between `begin` and `finish`. Only one
//! save per case may be in flight; saves for different cases may overlap,
//! so the user can keep drawing on the next image while the previous one is
//! still being persisted.

use std::collections::{HashMap, HashSet};
use std::time::Duration;
use web_time::Instant;

use crate::backend::CaseId;

/// Outcome of the most recent save attempt for a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct SaveRecord {
    at: Instant,
    outcome: SaveOutcome,
}

/// Tracks in-flight saves and the result of the last save per case.
#[derive(Debug, Default)]
pub struct SaveTracker {
    in_flight: HashSet<CaseId>,
    last: HashMap<CaseId, SaveRecord>,
    /// Cases edited since their last successful save.
    dirty: HashSet<CaseId>,
}

impl SaveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark that a case was edited and needs saving.
    pub fn mark_dirty(&mut self, case_id: CaseId) {
        if self.dirty.insert(case_id) {
            log::trace!("Save tracker: case {} marked dirty", case_id);
        }
    }

    /// Check if a case has unsaved edits.
    pub fn is_dirty(&self, case_id: CaseId) -> bool {
        self.dirty.contains(&case_id)
    }

    /// Check if a save for this case is in flight.
    pub fn is_busy(&self, case_id: CaseId) -> bool {
        self.in_flight.contains(&case_id)
    }

    /// Try to start a save. Returns `false` if one is already in flight for this case.
    pub fn begin(&mut self, case_id: CaseId) -> bool {
        let started = self.in_flight.insert(case_id);
        if started {
            log::trace!("Save tracker: save started for case {}", case_id);
        }
        started
    }

    /// Finish an in-flight save.
    ///
    /// A failed save keeps the case dirty so it can be retried.
    pub fn finish(&mut self, case_id: CaseId, outcome: SaveOutcome) {
        self.in_flight.remove(&case_id);
        self.last.insert(
            case_id,
            SaveRecord {
                at: Instant::now(),
                outcome,
            },
        );
        if outcome == SaveOutcome::Saved {
            self.dirty.remove(&case_id);
        }
        log::trace!("Save tracker: case {} finished with {:?}", case_id, outcome);
    }

    /// Result of the last finished save for a case, if any.
    pub fn last_outcome(&self, case_id: CaseId) -> Option<SaveOutcome> {
        self.last.get(&case_id).map(|r| r.outcome)
    }

    /// Get time since the last finished save for a case (if any).
    pub fn time_since_last_save(&self, case_id: CaseId) -> Option<Duration> {
        self.last.get(&case_id).map(|r| r.at.elapsed())
    }
}
