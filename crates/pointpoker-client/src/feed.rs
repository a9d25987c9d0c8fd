//! Events the sync reducers consume, and batch decoding.

use tracing::warn;

use crate::reconcile::Change;
use crate::store::{ChangeBatch, ChangeKind, Document, StoreError};

/// Input to a sync reducer from its subscription task.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent<T> {
    /// The subscription is being opened.
    Started,
    /// The feed delivered an update.
    Update(T),
    /// The subscription failed; no more updates will arrive.
    Failed(StoreError),
}

/// Decode a raw batch into typed changes, preserving order.
///
/// A document that fails to decode is skipped with a warning; a `Removed`
/// change only needs the id and is always kept.
pub fn decode_batch<T, E, F>(batch: ChangeBatch, mut decode: F) -> Vec<Change<T>>
where
    F: FnMut(Document) -> Result<T, E>,
    E: std::fmt::Display,
{
    let mut changes = Vec::with_capacity(batch.len());
    for change in batch.changes {
        let kind = change.kind;
        if kind == ChangeKind::Removed {
            changes.push(Change::Removed(change.document.id));
            continue;
        }

        let id = change.document.id.clone();
        match decode(change.document) {
            Ok(item) if kind == ChangeKind::Added => changes.push(Change::Added(item)),
            Ok(item) => changes.push(Change::Modified(item)),
            Err(e) => warn!(id = %id, %kind, error = %e, "skipping undecodable document"),
        }
    }
    changes
}
