//! Live subscriptions: each runs in its own task and publishes views.
//!
//! ```text
//!   DocumentStore feed ──▶ task: reduce ──▶ watch::Sender<Arc<View>> ──▶ screens
//!                            ▲
//!   Viewer (identity) ───────┘  republish when the local identity changes
//! ```
//!
//! Dropping a [`DirectoryWatch`] or [`RoomWatch`] cancels its task and drops
//! the feed. A task checks its token under the publish lock, so an update
//! that arrives after teardown is discarded rather than published.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use pointpoker_types::{CollectionPath, DocumentPath, Member, Room, RoomId, format_average};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::detail::RoomDetailSync;
use crate::directory::{DirectorySync, DirectoryView};
use crate::error::PokerError;
use crate::feed::FeedEvent;
use crate::identity::Viewer;
use crate::roster::{BallotLine, MemberRosterSync, render_ballot};
use crate::store::{ChangeBatch, Document, DocumentStore, StoreError};

// ============================================================================
// Views
// ============================================================================

/// Everything the room screen renders: the room, its roster, and status.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomView {
    pub room_id: RoomId,
    /// `member_count` is filled once the roster has loaded.
    pub room: Option<Room>,
    pub members: Arc<Vec<Member>>,
    pub is_loading: bool,
    /// The room error if any, else the roster error.
    pub error: Option<StoreError>,
}

impl RoomView {
    fn loading(room_id: RoomId) -> Self {
        Self {
            room_id,
            room: None,
            members: Arc::new(Vec::new()),
            is_loading: true,
            error: None,
        }
    }

    /// The state after leaving: nothing loaded, nothing pending.
    pub fn cleared(room_id: RoomId) -> Self {
        Self {
            is_loading: false,
            ..Self::loading(room_id)
        }
    }

    /// Whether vote input should be enabled.
    pub fn voting_open(&self) -> bool {
        self.room.as_ref().is_some_and(|r| r.voting_open())
    }

    pub fn is_owner(&self) -> bool {
        self.room.as_ref().is_some_and(|r| r.owner)
    }

    pub fn me(&self) -> Option<&Member> {
        self.members.iter().find(|m| m.its_me)
    }

    /// The roster with votes masked for this viewer.
    pub fn ballot(&self) -> Vec<BallotLine> {
        let average = self.room.as_ref().and_then(|r| r.average_point);
        render_ballot(&self.members, average)
    }

    /// The finalized average, formatted for display.
    pub fn average_text(&self) -> Option<String> {
        self.room.as_ref().and_then(|r| r.average_point).map(format_average)
    }
}

// ============================================================================
// Subscription handle
// ============================================================================

/// A running subscription task and the latest view it published.
pub struct Subscription<V> {
    rx: watch::Receiver<Arc<V>>,
    tx: Arc<watch::Sender<Arc<V>>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl<V: Send + Sync + 'static> Subscription<V> {
    /// The latest view.
    pub fn current(&self) -> Arc<V> {
        Arc::clone(&self.rx.borrow())
    }

    /// A receiver for change notifications.
    pub fn subscribe(&self) -> watch::Receiver<Arc<V>> {
        self.rx.clone()
    }

    /// Wait until the published view satisfies `pred`.
    pub async fn wait_until(&self, mut pred: impl FnMut(&V) -> bool) -> Result<Arc<V>, PokerError> {
        let mut rx = self.rx.clone();
        let view = rx.wait_for(|v| pred(v)).await.map_err(|_| PokerError::Shutdown)?;
        Ok(Arc::clone(&view))
    }

    /// Whether the task has exited (feed failed or cancelled).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the task. Later feed updates are discarded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl<V> Drop for Subscription<V> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Publish unless cancelled or unchanged.
fn publish<V: PartialEq>(tx: &watch::Sender<Arc<V>>, cancel: &CancellationToken, view: V) -> bool {
    tx.send_if_modified(|current| {
        if cancel.is_cancelled() || **current == view {
            return false;
        }
        *current = Arc::new(view);
        true
    })
}

async fn next_or_pending<T>(feed: &mut Option<BoxStream<'static, T>>) -> Option<T> {
    match feed {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

// ============================================================================
// Room directory
// ============================================================================

pub type DirectoryWatch = Subscription<DirectoryView>;

/// Subscribe to `Rooms` and publish a [`DirectoryView`] per update.
pub fn watch_directory(store: Arc<dyn DocumentStore>, viewer: watch::Receiver<Viewer>) -> DirectoryWatch {
    let (tx, rx) = watch::channel(Arc::new(DirectoryView::default()));
    let tx = Arc::new(tx);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_directory(store, viewer, Arc::clone(&tx), cancel.clone()));
    Subscription { rx, tx, cancel, task }
}

enum DirectoryEvent {
    Feed(Option<Result<ChangeBatch, StoreError>>),
    ViewerChanged,
    Cancelled,
}

#[instrument(skip_all)]
async fn run_directory(
    store: Arc<dyn DocumentStore>,
    mut viewer: watch::Receiver<Viewer>,
    tx: Arc<watch::Sender<Arc<DirectoryView>>>,
    cancel: CancellationToken,
) {
    let mut sync = DirectorySync::new();
    let v = viewer.borrow_and_update().clone();
    sync.reduce(FeedEvent::Started, &v);
    publish(&tx, &cancel, sync.view(&v));

    let rooms_path = CollectionPath::rooms();
    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        opened = store.subscribe_collection(&rooms_path) => opened,
    };
    let mut feed = match opened {
        Ok(feed) => Some(feed),
        Err(e) => {
            sync.reduce(FeedEvent::Failed(e), &v);
            publish(&tx, &cancel, sync.view(&v));
            return;
        }
    };

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => DirectoryEvent::Cancelled,
            item = next_or_pending(&mut feed) => DirectoryEvent::Feed(item),
            Ok(()) = viewer.changed() => DirectoryEvent::ViewerChanged,
        };

        let v = viewer.borrow_and_update().clone();
        let done = match event {
            DirectoryEvent::Cancelled => break,
            DirectoryEvent::ViewerChanged => false,
            DirectoryEvent::Feed(Some(Ok(batch))) => {
                sync.reduce(FeedEvent::Update(batch), &v);
                false
            }
            DirectoryEvent::Feed(Some(Err(e))) => {
                sync.reduce(FeedEvent::Failed(e), &v);
                true
            }
            DirectoryEvent::Feed(None) => {
                sync.reduce(FeedEvent::Failed(StoreError::Closed), &v);
                true
            }
        };
        publish(&tx, &cancel, sync.view(&v));
        if done {
            break;
        }
    }
    debug!(version = sync.version(), "directory task exiting");
}

// ============================================================================
// Room detail + roster
// ============================================================================

/// Live view of one room and its members.
pub struct RoomWatch {
    room_id: RoomId,
    inner: Subscription<RoomView>,
}

impl RoomWatch {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn current(&self) -> Arc<RoomView> {
        self.inner.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<RoomView>> {
        self.inner.subscribe()
    }

    pub async fn wait_until(&self, pred: impl FnMut(&RoomView) -> bool) -> Result<Arc<RoomView>, PokerError> {
        self.inner.wait_until(pred).await
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Tear down the subscription and publish an empty view.
    pub fn clear(&self) {
        self.inner.cancel();
        self.inner.tx.send_replace(Arc::new(RoomView::cleared(self.room_id.clone())));
        info!(room = %self.room_id, "room view cleared");
    }
}

/// Subscribe to one room document and its `Members` collection.
pub fn watch_room(store: Arc<dyn DocumentStore>, viewer: watch::Receiver<Viewer>, room_id: RoomId) -> RoomWatch {
    let (tx, rx) = watch::channel(Arc::new(RoomView::loading(room_id.clone())));
    let tx = Arc::new(tx);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_room(store, viewer, room_id.clone(), Arc::clone(&tx), cancel.clone()));
    RoomWatch {
        room_id,
        inner: Subscription { rx, tx, cancel, task },
    }
}

enum RoomEvent {
    Snapshot(Option<Result<Option<Document>, StoreError>>),
    Members(Option<Result<ChangeBatch, StoreError>>),
    ViewerChanged,
    Cancelled,
}

fn room_view(room_id: &RoomId, detail: &RoomDetailSync, roster: &MemberRosterSync, viewer: &Viewer) -> RoomView {
    let detail = detail.view(viewer);
    let roster = roster.view(viewer);
    let member_count = (!roster.is_loading && roster.error.is_none()).then(|| roster.members.len());
    let room = detail.room.map(|mut room| {
        room.member_count = member_count;
        room
    });
    RoomView {
        room_id: room_id.clone(),
        room,
        members: roster.members,
        is_loading: detail.is_loading || roster.is_loading,
        error: detail.error.or(roster.error),
    }
}

#[instrument(skip_all, fields(room = %room_id))]
async fn run_room(
    store: Arc<dyn DocumentStore>,
    mut viewer: watch::Receiver<Viewer>,
    room_id: RoomId,
    tx: Arc<watch::Sender<Arc<RoomView>>>,
    cancel: CancellationToken,
) {
    let mut detail = RoomDetailSync::new(room_id.clone());
    let mut roster = MemberRosterSync::new(room_id.clone());
    let v = viewer.borrow_and_update().clone();
    detail.reduce(FeedEvent::Started, &v);
    roster.reduce(FeedEvent::Started, &v);

    let room_path = DocumentPath::room(&room_id);
    let members_path = CollectionPath::members(&room_id);
    let (room_feed, member_feed) = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        opened = async {
            futures::join!(
                store.subscribe_document(&room_path),
                store.subscribe_collection(&members_path),
            )
        } => opened,
    };

    let mut room_feed = match room_feed {
        Ok(feed) => Some(feed),
        Err(e) => {
            detail.reduce(FeedEvent::Failed(e), &v);
            None
        }
    };
    let mut member_feed = match member_feed {
        Ok(feed) => Some(feed),
        Err(e) => {
            roster.reduce(FeedEvent::Failed(e), &v);
            None
        }
    };
    publish(&tx, &cancel, room_view(&room_id, &detail, &roster, &v));

    while room_feed.is_some() || member_feed.is_some() {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => RoomEvent::Cancelled,
            item = next_or_pending(&mut room_feed) => RoomEvent::Snapshot(item),
            item = next_or_pending(&mut member_feed) => RoomEvent::Members(item),
            Ok(()) = viewer.changed() => RoomEvent::ViewerChanged,
        };

        let v = viewer.borrow_and_update().clone();
        match event {
            RoomEvent::Cancelled => break,
            RoomEvent::ViewerChanged => {}
            RoomEvent::Snapshot(Some(Ok(snapshot))) => detail.reduce(FeedEvent::Update(snapshot), &v),
            RoomEvent::Snapshot(end) => {
                let e = end.and_then(Result::err).unwrap_or(StoreError::Closed);
                detail.reduce(FeedEvent::Failed(e), &v);
                room_feed = None;
            }
            RoomEvent::Members(Some(Ok(batch))) => {
                roster.reduce(FeedEvent::Update(batch), &v);
            }
            RoomEvent::Members(end) => {
                let e = end.and_then(Result::err).unwrap_or(StoreError::Closed);
                roster.reduce(FeedEvent::Failed(e), &v);
                member_feed = None;
            }
        }
        publish(&tx, &cancel, room_view(&room_id, &detail, &roster, &v));
    }
    debug!("room task exiting");
}
