//! Change-stream reconciliation into an ordered, unique-by-id list.
//!
//! Collection feeds deliver batches of `Added` / `Modified` / `Removed`
//! changes. [`Reconciler`] folds each batch into a materialized list so the
//! UI always has a plain `Vec` to render.
//!
//! # Rules per change, applied in arrival order
//!
//! |------------|----------------------------|------------------------------|
//! | Change     | id present                 | id absent                    |
//! |------------|----------------------------|------------------------------|
//! | `Added`    | no-op (duplicate delivery) | append at the end            |
//! | `Modified` | replace at the same index  | no-op, inconsistent state    |
//! | `Removed`  | delete                     | no-op, inconsistent state    |
//! |------------|----------------------------|------------------------------|
//!
//! A batch is applied to a copy of the current list and the copy replaces
//! the published `Arc` only when the whole batch is done. Readers holding
//! an earlier snapshot never see a partially applied batch.

use std::sync::Arc;

use pointpoker_types::{Member, Room};
use tracing::{debug, trace, warn};

use crate::store::ChangeKind;

/// An entity with a stable id within its collection.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Room {
    fn key(&self) -> &str {
        self.id.as_str()
    }
}

impl Keyed for Member {
    fn key(&self) -> &str {
        self.id.as_str()
    }
}

/// One decoded change. `Removed` only needs the id.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    Added(T),
    Modified(T),
    Removed(String),
}

impl<T: Keyed> Change<T> {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Added(_) => ChangeKind::Added,
            Change::Modified(_) => ChangeKind::Modified,
            Change::Removed(_) => ChangeKind::Removed,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Change::Added(item) | Change::Modified(item) => item.key(),
            Change::Removed(id) => id,
        }
    }
}

/// Why a change was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// `Added` for an id already in the list.
    DuplicateAdd { id: String },
    /// `Modified` or `Removed` for an id not in the list. Tolerated and
    /// logged, never surfaced as an error.
    InconsistentState { kind: ChangeKind, id: String },
}

/// Outcome of applying one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: Vec<SkipReason>,
}

impl ReconcileReport {
    /// Whether the batch changed the list.
    pub fn changed(&self) -> bool {
        self.added + self.modified + self.removed > 0
    }
}

/// Materialized list kept in sync with a collection feed.
#[derive(Debug, Clone)]
pub struct Reconciler<T> {
    items: Arc<Vec<T>>,
    /// Bumped on every batch that changes the list.
    version: u64,
}

impl<T> Default for Reconciler<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            version: 0,
        }
    }
}

impl<T: Keyed + Clone> Reconciler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current list. Cheap to clone and never mutated afterwards.
    pub fn snapshot(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.key() == id)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            self.items = Arc::new(Vec::new());
            self.version = self.version.wrapping_add(1);
        }
    }

    /// Apply one batch in order and publish the result.
    pub fn apply<I>(&mut self, changes: I) -> ReconcileReport
    where
        I: IntoIterator<Item = Change<T>>,
    {
        let mut next: Vec<T> = self.items.as_ref().clone();
        let mut report = ReconcileReport::default();

        for change in changes {
            match change {
                Change::Added(item) => {
                    if next.iter().any(|e| e.key() == item.key()) {
                        trace!(id = item.key(), "duplicate add ignored");
                        report.skipped.push(SkipReason::DuplicateAdd {
                            id: item.key().to_string(),
                        });
                    } else {
                        next.push(item);
                        report.added += 1;
                    }
                }
                Change::Modified(item) => match next.iter().position(|e| e.key() == item.key()) {
                    Some(idx) => {
                        next[idx] = item;
                        report.modified += 1;
                    }
                    None => {
                        warn!(id = item.key(), "modified change for unknown id");
                        report.skipped.push(SkipReason::InconsistentState {
                            kind: ChangeKind::Modified,
                            id: item.key().to_string(),
                        });
                    }
                },
                Change::Removed(id) => match next.iter().position(|e| e.key() == id) {
                    Some(idx) => {
                        next.remove(idx);
                        report.removed += 1;
                    }
                    None => {
                        debug!(id = %id, "removed change for unknown id");
                        report.skipped.push(SkipReason::InconsistentState {
                            kind: ChangeKind::Removed,
                            id,
                        });
                    }
                },
            }
        }

        if report.changed() {
            self.items = Arc::new(next);
            self.version = self.version.wrapping_add(1);
        }
        report
    }
}
