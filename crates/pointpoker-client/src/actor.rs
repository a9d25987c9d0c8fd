//! Actor that serializes every mutation the client makes.
//!
//! ```text
//!   ClientHandle (Clone, Send+Sync)   mpsc     ClientActor (tokio task)
//!   ┌──────────────────────────┐  ────────▶  ┌─────────────────────────┐
//!   │ .join_room()             │             │ Arc<dyn DocumentStore>  │
//!   │ .cast_vote()             │  ◀────────  │ IdentityStore           │
//!   │ .compute_average()       │   oneshot   │ watch::Sender<Viewer>   │
//!   └──────────────────────────┘             └─────────────────────────┘
//!          │ watch_rooms() / open_room()
//!          ▼
//!   subscription tasks (one per screen, see [`subscriptions`](crate::subscriptions))
//! ```
//!
//! Commands run one at a time, so identity writes are never interleaved:
//! a join waits for the identity it depends on before it touches the room.
//! Subscriptions do not go through the actor and keep receiving updates
//! while a mutation is in flight.

use std::sync::Arc;

use pointpoker_types::{Member, Room, RoomId, UserIdentity};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::average::{plan_finalize, plan_reset};
use crate::config::ClientConfig;
use crate::directory::{plan_create_room, plan_join, plan_remove};
use crate::draft::RoomDraft;
use crate::error::PokerError;
use crate::identity::{IdentityTransition, Viewer, ensure_identity, require_identity};
use crate::prefs::IdentityStore;
use crate::roster::{plan_leave, plan_vote};
use crate::store::DocumentStore;
use crate::subscriptions::{DirectoryWatch, RoomView, RoomWatch, watch_directory, watch_room};

// ============================================================================
// Commands (internal)
// ============================================================================

type Reply<T> = oneshot::Sender<Result<T, PokerError>>;

enum ClientCommand {
    EnsureIdentity {
        name: String,
        reply: Reply<IdentityTransition>,
    },
    CreateRoom {
        display_name: String,
        draft: RoomDraft,
        reply: Reply<RoomId>,
    },
    JoinRoom {
        room_id: RoomId,
        display_name: String,
        reply: Reply<()>,
    },
    RemoveRoom {
        room_id: RoomId,
        reply: Reply<()>,
    },
    CastVote {
        room_id: RoomId,
        point: f64,
        reply: Reply<()>,
    },
    LeaveRoom {
        room_id: RoomId,
        reply: Reply<()>,
    },
    Finalize {
        room: Room,
        members: Arc<Vec<Member>>,
        reply: Reply<f64>,
    },
    Reset {
        room: Room,
        reply: Reply<()>,
    },
}

// ============================================================================
// ClientHandle (public API)
// ============================================================================

/// Handle to a running client. Cheap to clone.
#[derive(Clone)]
pub struct ClientHandle {
    tx: mpsc::UnboundedSender<ClientCommand>,
    store: Arc<dyn DocumentStore>,
    identities: IdentityStore,
    viewer: watch::Receiver<Viewer>,
    config: Arc<ClientConfig>,
}

impl ClientHandle {
    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> ClientCommand) -> Result<T, PokerError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).map_err(|_| PokerError::Shutdown)?;
        rx.await.map_err(|_| PokerError::Shutdown)?
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The stored identity, if one has been created.
    pub fn identity(&self) -> Option<UserIdentity> {
        self.identities.identity()
    }

    /// Display name to prefill forms with. Empty when none is stored.
    pub fn user_name(&self) -> String {
        self.identities.user_name()
    }

    pub fn viewer(&self) -> Viewer {
        self.viewer.borrow().clone()
    }

    /// A blank create-room form using the configured scale.
    pub fn new_draft(&self) -> RoomDraft {
        RoomDraft::new(&self.config)
    }

    // ── Identity ─────────────────────────────────────────────────────────

    /// Create or rename the local user.
    pub async fn ensure_identity(&self, name: &str) -> Result<IdentityTransition, PokerError> {
        let name = name.to_string();
        self.call(|reply| ClientCommand::EnsureIdentity { name, reply }).await
    }

    // ── Rooms ────────────────────────────────────────────────────────────

    /// Create a room led by the local user, named `display_name`.
    pub async fn create_room(&self, display_name: &str, draft: RoomDraft) -> Result<RoomId, PokerError> {
        let display_name = display_name.to_string();
        self.call(|reply| ClientCommand::CreateRoom {
            display_name,
            draft,
            reply,
        })
        .await
    }

    /// Join `room_id` as `display_name` and remember it as the recent room.
    pub async fn join_room(&self, room_id: &RoomId, display_name: &str) -> Result<(), PokerError> {
        let room_id = room_id.clone();
        let display_name = display_name.to_string();
        self.call(|reply| ClientCommand::JoinRoom {
            room_id,
            display_name,
            reply,
        })
        .await
    }

    /// Delete a room. Only the leader should call this; the store enforces it.
    pub async fn remove_room(&self, room_id: &RoomId) -> Result<(), PokerError> {
        let room_id = room_id.clone();
        self.call(|reply| ClientCommand::RemoveRoom { room_id, reply }).await
    }

    // ── Voting ───────────────────────────────────────────────────────────

    /// Record the local user's vote. Not checked against a finalized room;
    /// gate input on [`RoomView::voting_open`].
    pub async fn cast_vote(&self, room_id: &RoomId, point: f64) -> Result<(), PokerError> {
        let room_id = room_id.clone();
        self.call(|reply| ClientCommand::CastVote { room_id, point, reply }).await
    }

    /// Delete the local user's member document.
    pub async fn leave_room(&self, room_id: &RoomId) -> Result<(), PokerError> {
        let room_id = room_id.clone();
        self.call(|reply| ClientCommand::LeaveRoom { room_id, reply }).await
    }

    /// Leave the watched room and clear its view.
    pub async fn leave(&self, room: &RoomWatch) -> Result<(), PokerError> {
        self.leave_room(room.room_id()).await?;
        room.clear();
        Ok(())
    }

    /// Average the votes in `view` and write it to the room.
    pub async fn compute_average(&self, view: &RoomView) -> Result<f64, PokerError> {
        let room = loaded_room(view)?;
        let members = Arc::clone(&view.members);
        self.call(|reply| ClientCommand::Finalize { room, members, reply }).await
    }

    /// Clear the room's average so voting reopens.
    pub async fn reset_average(&self, view: &RoomView) -> Result<(), PokerError> {
        let room = loaded_room(view)?;
        self.call(|reply| ClientCommand::Reset { room, reply }).await
    }

    // ── Subscriptions ────────────────────────────────────────────────────

    /// Start syncing the room directory.
    pub fn watch_rooms(&self) -> DirectoryWatch {
        watch_directory(Arc::clone(&self.store), self.viewer.clone())
    }

    /// Start syncing one room and its roster.
    pub fn open_room(&self, room_id: &RoomId) -> RoomWatch {
        watch_room(Arc::clone(&self.store), self.viewer.clone(), room_id.clone())
    }
}

fn loaded_room(view: &RoomView) -> Result<Room, PokerError> {
    view.room
        .clone()
        .ok_or_else(|| PokerError::RoomUnavailable(format!("room {} is not loaded", view.room_id)))
}

// ============================================================================
// ClientActor (internal)
// ============================================================================

struct ClientActor {
    store: Arc<dyn DocumentStore>,
    identities: IdentityStore,
    viewer: watch::Sender<Viewer>,
}

impl ClientActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ClientCommand>) {
        while let Some(cmd) = rx.recv().await {
            self.handle_command(cmd).await;
        }
        debug!("client actor shutting down: channel closed");
    }

    async fn handle_command(&mut self, cmd: ClientCommand) {
        match cmd {
            ClientCommand::EnsureIdentity { name, reply } => {
                let _ = reply.send(self.ensure_identity(&name).await);
            }
            ClientCommand::CreateRoom {
                display_name,
                draft,
                reply,
            } => {
                let _ = reply.send(self.create_room(&display_name, &draft).await);
            }
            ClientCommand::JoinRoom {
                room_id,
                display_name,
                reply,
            } => {
                let _ = reply.send(self.join_room(&room_id, &display_name).await);
            }
            ClientCommand::RemoveRoom { room_id, reply } => {
                let result = plan_remove(&room_id).apply(self.store.as_ref()).await;
                if let Err(e) = &result {
                    warn!(room = %room_id, error = %e, "remove room failed");
                }
                let _ = reply.send(result.map(|_| ()).map_err(PokerError::from));
            }
            ClientCommand::CastVote { room_id, point, reply } => {
                let _ = reply.send(self.cast_vote(&room_id, point).await);
            }
            ClientCommand::LeaveRoom { room_id, reply } => {
                let _ = reply.send(self.leave_room(&room_id).await);
            }
            ClientCommand::Finalize { room, members, reply } => {
                let _ = reply.send(self.finalize(&room, &members).await);
            }
            ClientCommand::Reset { room, reply } => {
                let result = match plan_reset(&room) {
                    Ok(mutation) => mutation.apply(self.store.as_ref()).await.map(|_| ()).map_err(PokerError::from),
                    Err(e) => Err(e),
                };
                if result.is_ok() {
                    info!(room = %room.id, "average reset");
                }
                let _ = reply.send(result);
            }
        }
    }

    /// Publish identity changes to the subscription tasks. Runs before the
    /// reply is sent so a caller never observes a stale viewer.
    fn refresh_viewer(&self) {
        let next = Viewer::from_store(&self.identities);
        self.viewer.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    async fn ensure_identity(&self, name: &str) -> Result<IdentityTransition, PokerError> {
        let transition = ensure_identity(self.store.as_ref(), &self.identities, name).await?;
        self.refresh_viewer();
        Ok(transition)
    }

    async fn create_room(&self, display_name: &str, draft: &RoomDraft) -> Result<RoomId, PokerError> {
        draft.validate()?;
        let leader = self.ensure_identity(display_name).await?.into_identity();
        let mutation = plan_create_room(&leader, draft)?;
        let id = mutation
            .apply(self.store.as_ref())
            .await?
            .ok_or_else(|| PokerError::RoomUnavailable("store returned no room id".into()))?;
        let room_id = RoomId::new(id);
        info!(room = %room_id, name = %draft.name, leader = %leader, "room created");
        Ok(room_id)
    }

    async fn join_room(&self, room_id: &RoomId, display_name: &str) -> Result<(), PokerError> {
        let me = self.ensure_identity(display_name).await?.into_identity();
        plan_join(room_id, &me)?.apply(self.store.as_ref()).await?;
        self.identities.save_recent_room(room_id)?;
        self.refresh_viewer();
        info!(room = %room_id, user = %me, "joined room");
        Ok(())
    }

    async fn cast_vote(&self, room_id: &RoomId, point: f64) -> Result<(), PokerError> {
        let me = require_identity(&self.identities)?;
        plan_vote(room_id, &me, point)?.apply(self.store.as_ref()).await?;
        debug!(room = %room_id, user = %me, point, "vote cast");
        Ok(())
    }

    async fn leave_room(&self, room_id: &RoomId) -> Result<(), PokerError> {
        let me = require_identity(&self.identities)?;
        plan_leave(room_id, &me.id).apply(self.store.as_ref()).await?;
        info!(room = %room_id, user = %me, "left room");
        Ok(())
    }

    async fn finalize(&self, room: &Room, members: &[Member]) -> Result<f64, PokerError> {
        let (average, mutation) = plan_finalize(room, members)?;
        mutation.apply(self.store.as_ref()).await?;
        info!(room = %room.id, average, "average finalized");
        Ok(average)
    }
}

// ============================================================================
// Public spawn function
// ============================================================================

/// Spawn the client actor on the current tokio runtime.
pub fn spawn_client(store: Arc<dyn DocumentStore>, identities: IdentityStore, config: ClientConfig) -> ClientHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let (viewer_tx, viewer_rx) = watch::channel(Viewer::from_store(&identities));
    let actor = ClientActor {
        store: Arc::clone(&store),
        identities: identities.clone(),
        viewer: viewer_tx,
    };
    tokio::spawn(actor.run(rx));
    ClientHandle {
        tx,
        store,
        identities,
        viewer: viewer_rx,
        config: Arc::new(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::{MemoryStore, OpKind};
    use pointpoker_types::{DocumentPath, MemberRecord, PointScale, RoomRecord};

    fn client() -> (MemoryStore, ClientHandle) {
        let store = MemoryStore::new();
        let handle = spawn_client(Arc::new(store.clone()), IdentityStore::in_memory(), ClientConfig::default());
        (store, handle)
    }

    #[tokio::test]
    async fn test_create_room_ensures_identity_first() {
        let (store, client) = client();
        let mut draft = client.new_draft();
        draft.name = "Sprint".into();

        let room_id = client.create_room("Alice", draft).await.unwrap();
        let me = client.identity().unwrap();
        let record = RoomRecord::from_fields(&store.get(&DocumentPath::room(&room_id)).unwrap()).unwrap();
        assert_eq!(record.leader, me.id);
        assert_eq!(record.points, PointScale::from_values(crate::constants::DEFAULT_POINT_SCALE));

        let kinds: Vec<_> = store.op_log().iter().map(|op| op.kind).collect();
        assert_eq!(kinds, [OpKind::Add, OpKind::Add]);
        assert!(store.op_log()[0].path.starts_with("Users"));
    }

    #[tokio::test]
    async fn test_create_room_rejects_empty_name_without_writes() {
        let (store, client) = client();
        let err = client.create_room("Alice", client.new_draft()).await.unwrap_err();
        assert!(matches!(err, PokerError::InvalidInput(_)));
        assert!(store.op_log().is_empty());
    }

    #[tokio::test]
    async fn test_join_saves_recent_room() {
        let (store, client) = client();
        let room_id = RoomId::new("r1");
        client.join_room(&room_id, "Bob").await.unwrap();

        let me = client.identity().unwrap();
        let fields = store.get(&DocumentPath::member(&room_id, &me.id)).unwrap();
        assert_eq!(MemberRecord::from_fields(&fields).unwrap(), MemberRecord::joined("Bob"));
        assert_eq!(client.viewer().recent_room, Some(room_id));
    }

    #[tokio::test]
    async fn test_join_aborts_when_identity_fails() {
        let (store, client) = client();
        store.set_offline(true);
        let err = client.join_room(&RoomId::new("r1"), "Bob").await.unwrap_err();
        assert!(matches!(err, PokerError::Identity(_)));
        assert_eq!(store.count_ops(OpKind::Set, "Rooms"), 0);
        assert!(client.viewer().recent_room.is_none());
    }

    #[tokio::test]
    async fn test_vote_without_identity() {
        let (_store, client) = client();
        let err = client.cast_vote(&RoomId::new("r1"), 3.0).await.unwrap_err();
        assert!(matches!(err, PokerError::Identity(_)));
    }

    #[tokio::test]
    async fn test_finalize_without_room_loaded() {
        let (_store, client) = client();
        let view = RoomView::cleared(RoomId::new("r1"));
        assert!(matches!(client.compute_average(&view).await, Err(PokerError::RoomUnavailable(_))));
        assert!(matches!(client.reset_average(&view).await, Err(PokerError::RoomUnavailable(_))));
    }

    #[tokio::test]
    async fn test_mutation_failure_surfaces_backend_error() {
        let (store, client) = client();
        client.ensure_identity("Alice").await.unwrap();
        store.set_offline(true);
        let err = client.cast_vote(&RoomId::new("r1"), 1.0).await.unwrap_err();
        assert!(matches!(err, PokerError::BackendUnavailable(_)));
    }
}
