//! In-process [`DocumentStore`] for tests, demos, and offline development.
//!
//! Behaves like a hosted real-time document database as far as the client
//! can observe:
//!
//! - A collection feed first delivers every existing document as `Added`
//!   (possibly an empty batch), then one batch per mutation.
//! - A document feed delivers the current snapshot (or `None`) immediately
//!   and again after every write or delete of that document.
//! - Deleting a document does not delete its sub-collections.
//!
//! Fault injection (`set_offline`, `fail_subscriptions`, `break_feeds`) and
//! the operation log exist so tests can exercise the client's error paths
//! and count calls.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use indexmap::IndexMap;
use parking_lot::Mutex;
use pointpoker_types::{CollectionPath, DocumentPath, Fields};
use tracing::{debug, trace};

use crate::store::{
    ChangeBatch, ChangeFeed, ChangeKind, Document, DocumentChange, DocumentStore, SnapshotFeed,
    StoreError,
};

/// Kind of mutation recorded in the operation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum OpKind {
    Add,
    Set,
    Delete,
}

/// One attempted mutation, recorded whether or not it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOp {
    pub kind: OpKind,
    /// Collection path for `Add`, document path otherwise.
    pub path: String,
}

type BatchSender = mpsc::UnboundedSender<Result<ChangeBatch, StoreError>>;
type SnapshotSender = mpsc::UnboundedSender<Result<Option<Document>, StoreError>>;

#[derive(Default)]
struct Inner {
    collections: HashMap<CollectionPath, IndexMap<String, Fields>>,
    collection_feeds: Vec<(CollectionPath, BatchSender)>,
    document_feeds: Vec<(DocumentPath, SnapshotSender)>,
    offline: bool,
    fail_subscriptions: bool,
    op_log: Vec<StoreOp>,
}

impl Inner {
    fn record(&mut self, kind: OpKind, path: String) {
        self.op_log.push(StoreOp { kind, path });
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline {
            Err(StoreError::Unavailable("store is offline".into()))
        } else {
            Ok(())
        }
    }

    fn get(&self, path: &DocumentPath) -> Option<Document> {
        self.collections
            .get(path.collection())
            .and_then(|docs| docs.get(path.id()))
            .map(|fields| Document {
                id: path.id().to_string(),
                fields: fields.clone(),
            })
    }

    /// Push a change to collection and document feeds, dropping closed feeds.
    fn notify(&mut self, path: &DocumentPath, kind: ChangeKind, document: Document) {
        let batch = ChangeBatch::new(vec![DocumentChange {
            kind,
            document: document.clone(),
        }]);
        self.collection_feeds.retain(|(feed_path, tx)| {
            if feed_path != path.collection() {
                return !tx.is_closed();
            }
            tx.unbounded_send(Ok(batch.clone())).is_ok()
        });

        let snapshot = match kind {
            ChangeKind::Removed => None,
            ChangeKind::Added | ChangeKind::Modified => Some(document),
        };
        self.document_feeds.retain(|(feed_path, tx)| {
            if feed_path != path {
                return !tx.is_closed();
            }
            tx.unbounded_send(Ok(snapshot.clone())).is_ok()
        });
        trace!(%path, %kind, "notified feeds");
    }
}

/// An in-memory document store. Cloning shares the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every mutation fail with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    /// Make new subscriptions fail with [`StoreError::Unavailable`].
    pub fn fail_subscriptions(&self, fail: bool) {
        self.inner.lock().fail_subscriptions = fail;
    }

    /// Terminate every open feed with `error`.
    pub fn break_feeds(&self, error: StoreError) {
        let mut inner = self.inner.lock();
        for (_, tx) in inner.collection_feeds.drain(..) {
            let _ = tx.unbounded_send(Err(error.clone()));
        }
        for (_, tx) in inner.document_feeds.drain(..) {
            let _ = tx.unbounded_send(Err(error.clone()));
        }
    }

    /// Deliver a raw batch to a collection's feeds without changing stored
    /// data. Simulates duplicate or out-of-band delivery.
    pub fn inject_batch(&self, path: &CollectionPath, batch: ChangeBatch) {
        let mut inner = self.inner.lock();
        inner.collection_feeds.retain(|(feed_path, tx)| {
            if feed_path != path {
                return !tx.is_closed();
            }
            tx.unbounded_send(Ok(batch.clone())).is_ok()
        });
    }

    /// Read a document directly.
    pub fn get(&self, path: &DocumentPath) -> Option<Fields> {
        self.inner.lock().get(path).map(|doc| doc.fields)
    }

    /// All documents of a collection in insertion order.
    pub fn documents(&self, path: &CollectionPath) -> Vec<Document> {
        self.inner
            .lock()
            .collections
            .get(path)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every mutation attempted so far.
    pub fn op_log(&self) -> Vec<StoreOp> {
        self.inner.lock().op_log.clone()
    }

    /// Count attempted mutations of `kind` whose path starts with `prefix`.
    pub fn count_ops(&self, kind: OpKind, prefix: &str) -> usize {
        self.inner
            .lock()
            .op_log
            .iter()
            .filter(|op| op.kind == kind && op.path.starts_with(prefix))
            .count()
    }

    /// Number of feeds still registered (closed feeds are pruned lazily).
    pub fn open_feed_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.collection_feeds.iter().filter(|(_, tx)| !tx.is_closed()).count()
            + inner.document_feeds.iter().filter(|(_, tx)| !tx.is_closed()).count()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn subscribe_collection(&self, path: &CollectionPath) -> Result<ChangeFeed, StoreError> {
        let mut inner = self.inner.lock();
        if inner.fail_subscriptions {
            return Err(StoreError::Unavailable(format!("cannot subscribe to {path}")));
        }

        let (tx, rx) = mpsc::unbounded();
        let initial: Vec<DocumentChange> = inner
            .collections
            .get(path)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| DocumentChange {
                        kind: ChangeKind::Added,
                        document: Document {
                            id: id.clone(),
                            fields: fields.clone(),
                        },
                    })
                    .collect()
            })
            .unwrap_or_default();
        debug!(%path, initial = initial.len(), "collection feed opened");
        let _ = tx.unbounded_send(Ok(ChangeBatch::new(initial)));
        inner.collection_feeds.push((path.clone(), tx));
        Ok(rx.boxed())
    }

    async fn subscribe_document(&self, path: &DocumentPath) -> Result<SnapshotFeed, StoreError> {
        let mut inner = self.inner.lock();
        if inner.fail_subscriptions {
            return Err(StoreError::Unavailable(format!("cannot subscribe to {path}")));
        }

        let (tx, rx) = mpsc::unbounded();
        let _ = tx.unbounded_send(Ok(inner.get(path)));
        debug!(%path, "document feed opened");
        inner.document_feeds.push((path.clone(), tx));
        Ok(rx.boxed())
    }

    async fn add_document(&self, collection: &CollectionPath, fields: Fields) -> Result<String, StoreError> {
        let mut inner = self.inner.lock();
        inner.record(OpKind::Add, collection.to_string());
        inner.check_online()?;

        let id = uuid::Uuid::now_v7().simple().to_string();
        inner
            .collections
            .entry(collection.clone())
            .or_default()
            .insert(id.clone(), fields.clone());
        let path = collection.doc(id.clone());
        inner.notify(&path, ChangeKind::Added, Document { id: id.clone(), fields });
        Ok(id)
    }

    async fn set_document(&self, path: &DocumentPath, fields: Fields) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.record(OpKind::Set, path.to_string());
        inner.check_online()?;

        let previous = inner
            .collections
            .entry(path.collection().clone())
            .or_default()
            .insert(path.id().to_string(), fields.clone());
        let kind = if previous.is_some() {
            ChangeKind::Modified
        } else {
            ChangeKind::Added
        };
        let document = Document {
            id: path.id().to_string(),
            fields,
        };
        inner.notify(path, kind, document);
        Ok(())
    }

    async fn delete_document(&self, path: &DocumentPath) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.record(OpKind::Delete, path.to_string());
        inner.check_online()?;

        // shift_remove keeps the order of the remaining documents
        let removed = inner
            .collections
            .get_mut(path.collection())
            .and_then(|docs| docs.shift_remove(path.id()));
        if let Some(fields) = removed {
            let document = Document {
                id: path.id().to_string(),
                fields,
            };
            inner.notify(path, ChangeKind::Removed, document);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointpoker_types::{MemberRecord, PointScale, RoomId, RoomRecord, UserId};

    fn room_fields(name: &str) -> Fields {
        RoomRecord::new(name, UserId::new("u1"), PointScale::from_values([1.0]))
            .to_fields()
            .unwrap()
    }

    #[tokio::test]
    async fn test_collection_feed_initial_then_changes() {
        let store = MemoryStore::new();
        let rooms = CollectionPath::rooms();
        let first = store.add_document(&rooms, room_fields("a")).await.unwrap();

        let mut feed = store.subscribe_collection(&rooms).await.unwrap();
        let initial = feed.next().await.unwrap().unwrap();
        assert_eq!(initial.len(), 1);
        assert_eq!(initial.changes[0].kind, ChangeKind::Added);
        assert_eq!(initial.changes[0].document.id, first);

        store.set_document(&rooms.doc(first.clone()), room_fields("b")).await.unwrap();
        let modified = feed.next().await.unwrap().unwrap();
        assert_eq!(modified.changes[0].kind, ChangeKind::Modified);

        store.delete_document(&rooms.doc(first)).await.unwrap();
        let removed = feed.next().await.unwrap().unwrap();
        assert_eq!(removed.changes[0].kind, ChangeKind::Removed);
    }

    #[tokio::test]
    async fn test_empty_collection_delivers_empty_batch() {
        let store = MemoryStore::new();
        let mut feed = store.subscribe_collection(&CollectionPath::rooms()).await.unwrap();
        assert!(feed.next().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_document_feed_tracks_snapshot() {
        let store = MemoryStore::new();
        let path = DocumentPath::room(&RoomId::new("r1"));
        let mut feed = store.subscribe_document(&path).await.unwrap();
        assert_eq!(feed.next().await.unwrap().unwrap(), None);

        store.set_document(&path, room_fields("a")).await.unwrap();
        let snapshot = feed.next().await.unwrap().unwrap().unwrap();
        assert_eq!(snapshot.id, "r1");

        store.delete_document(&path).await.unwrap();
        assert_eq!(feed.next().await.unwrap().unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_room_keeps_members() {
        let store = MemoryStore::new();
        let room = RoomId::new("r1");
        store.set_document(&DocumentPath::room(&room), room_fields("a")).await.unwrap();
        let member = DocumentPath::member(&room, &UserId::new("u1"));
        store
            .set_document(&member, MemberRecord::joined("Alice").to_fields().unwrap())
            .await
            .unwrap();

        store.delete_document(&DocumentPath::room(&room)).await.unwrap();
        assert!(store.get(&DocumentPath::room(&room)).is_none());
        assert!(store.get(&member).is_some());
    }

    #[tokio::test]
    async fn test_offline_rejects_mutations_but_logs_them() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let err = store
            .add_document(&CollectionPath::users(), Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.count_ops(OpKind::Add, "Users"), 1);
        assert!(store.documents(&CollectionPath::users()).is_empty());
    }

    #[tokio::test]
    async fn test_break_feeds_delivers_error() {
        let store = MemoryStore::new();
        let mut feed = store.subscribe_collection(&CollectionPath::rooms()).await.unwrap();
        let _ = feed.next().await;
        store.break_feeds(StoreError::PermissionDenied("rules".into()));
        assert!(matches!(feed.next().await, Some(Err(StoreError::PermissionDenied(_)))));
        assert!(feed.next().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_feed_is_pruned() {
        let store = MemoryStore::new();
        let feed = store.subscribe_collection(&CollectionPath::rooms()).await.unwrap();
        assert_eq!(store.open_feed_count(), 1);
        drop(feed);
        assert_eq!(store.open_feed_count(), 0);
        store.add_document(&CollectionPath::rooms(), room_fields("a")).await.unwrap();
    }
}
