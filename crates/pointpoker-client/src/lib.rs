//! Pointpoker sync client library
//!
//! Keeps rooms, room detail, and member rosters in sync with a real-time
//! document store, and performs the planning-poker mutations (create, join,
//! vote, leave, finalize) on behalf of the local user.
//!
//! Start with [`spawn_client`], then open subscriptions from the returned
//! [`ClientHandle`]:
//!
//! ```no_run
//! # async fn demo() -> Result<(), pointpoker_client::PokerError> {
//! use std::sync::Arc;
//! use pointpoker_client::{ClientConfig, IdentityStore, MemoryStore, spawn_client};
//!
//! let client = spawn_client(Arc::new(MemoryStore::new()), IdentityStore::in_memory(), ClientConfig::default());
//! let rooms = client.watch_rooms();
//! let mut draft = client.new_draft();
//! draft.name = "Sprint 12".into();
//! let room_id = client.create_room("Alice", draft).await?;
//! client.join_room(&room_id, "Alice").await?;
//! let room = client.open_room(&room_id);
//! client.cast_vote(&room_id, 3.0).await?;
//! # drop((rooms, room));
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod average;
pub mod config;
pub mod constants;
pub mod detail;
pub mod directory;
pub mod draft;
pub mod error;
pub mod feed;
pub mod identity;
pub mod memory_store;
pub mod prefs;
pub mod reconcile;
pub mod roster;
pub mod store;
pub mod subscriptions;

pub use actor::{ClientHandle, spawn_client};
pub use average::{compute_average, plan_finalize, plan_reset};
pub use config::{ClientConfig, ConfigError, default_config_path, default_preferences_path};
pub use detail::{DetailView, RoomDetailSync};
pub use directory::{DirectorySync, DirectoryView, plan_create_room, plan_join, plan_remove};
pub use draft::RoomDraft;
pub use error::PokerError;
pub use feed::FeedEvent;
pub use identity::{IdentityPlan, IdentityTransition, Viewer, ensure_identity, plan_identity, require_identity};
pub use memory_store::{MemoryStore, OpKind, StoreOp};
pub use prefs::{FilePreferences, IdentityStore, MemoryPreferences, Preferences, PrefsError};
pub use reconcile::{Change, Keyed, ReconcileReport, Reconciler, SkipReason};
pub use roster::{
    BallotLine, MemberRosterSync, RosterView, VoteDisplay, plan_leave, plan_vote, render_ballot, visible_vote,
};
pub use store::{
    ChangeBatch, ChangeFeed, ChangeKind, Document, DocumentChange, DocumentStore, Mutation, SnapshotFeed,
    StoreError,
};
pub use subscriptions::{DirectoryWatch, RoomView, RoomWatch, Subscription, watch_directory, watch_room};
