//! The real-time document store the client syncs against.
//!
//! The store is an external collaborator: it persists documents, pushes
//! change feeds, and decides consistency. The client only consumes it
//! through [`DocumentStore`], which has two kinds of calls:
//!
//! - **Feeds** (`subscribe_*`): an indefinite stream of batches that ends
//!   only when the stream is dropped or the store reports an error.
//! - **Mutations** (`add_document`, `set_document`, `delete_document`):
//!   exactly one terminal result per call.
//!
//! Writes are full overwrites; there is no partial field update.

use async_trait::async_trait;
use futures::stream::BoxStream;
use pointpoker_types::{CollectionPath, DocumentPath, Fields, RecordError};
use thiserror::Error;

/// Errors reported by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Network failure or store offline.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Rejected by the store's security rules.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("document not found: {0}")]
    NotFound(String),
    /// A document could not be encoded or decoded.
    #[error("record codec error: {0}")]
    Codec(String),
    /// The feed ended without an error.
    #[error("subscription closed")]
    Closed,
}

impl From<RecordError> for StoreError {
    fn from(e: RecordError) -> Self {
        StoreError::Codec(e.to_string())
    }
}

/// How a document changed within a collection feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// A stored document: its id within the collection plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// One change in a collection feed.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
    pub kind: ChangeKind,
    pub document: Document,
}

/// The changes delivered together by one feed update, in store order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeBatch {
    pub changes: Vec<DocumentChange>,
}

impl ChangeBatch {
    pub fn new(changes: Vec<DocumentChange>) -> Self {
        Self { changes }
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Feed of batches for a collection.
pub type ChangeFeed = BoxStream<'static, Result<ChangeBatch, StoreError>>;

/// Feed of snapshots for a single document (`None` = does not exist).
pub type SnapshotFeed = BoxStream<'static, Result<Option<Document>, StoreError>>;

/// Real-time document store consumed by the client.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Subscribe to every document change in a collection.
    async fn subscribe_collection(&self, path: &CollectionPath) -> Result<ChangeFeed, StoreError>;

    /// Subscribe to snapshots of one document.
    async fn subscribe_document(&self, path: &DocumentPath) -> Result<SnapshotFeed, StoreError>;

    /// Create a document with a store-generated id and return the id.
    async fn add_document(&self, collection: &CollectionPath, fields: Fields) -> Result<String, StoreError>;

    /// Create or fully overwrite a document.
    async fn set_document(&self, path: &DocumentPath, fields: Fields) -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete_document(&self, path: &DocumentPath) -> Result<(), StoreError>;
}

/// A write request, planned without touching the store.
///
/// The planning functions in this crate return `Mutation`s so the decision
/// logic can be tested without I/O; [`Mutation::apply`] performs the write.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Add { collection: CollectionPath, fields: Fields },
    Set { path: DocumentPath, fields: Fields },
    Delete { path: DocumentPath },
}

impl Mutation {
    /// Perform the write. Returns the generated id for `Add`.
    pub async fn apply(self, store: &dyn DocumentStore) -> Result<Option<String>, StoreError> {
        match self {
            Mutation::Add { collection, fields } => {
                store.add_document(&collection, fields).await.map(Some)
            }
            Mutation::Set { path, fields } => store.set_document(&path, fields).await.map(|_| None),
            Mutation::Delete { path } => store.delete_document(&path).await.map(|_| None),
        }
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            Mutation::Add { collection, .. } => format!("add {collection}"),
            Mutation::Set { path, .. } => format!("set {path}"),
            Mutation::Delete { path } => format!("delete {path}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_change_kind_strings() {
        assert_eq!(ChangeKind::Added.to_string(), "added");
        assert_eq!(ChangeKind::from_str("removed").unwrap(), ChangeKind::Removed);
    }

    #[test]
    fn test_mutation_describe() {
        let path = CollectionPath::rooms().doc("r1");
        assert_eq!(Mutation::Delete { path }.describe(), "delete Rooms/r1");
    }
}
