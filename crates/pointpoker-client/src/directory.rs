//! Room directory: every room, kept in sync with the `Rooms` collection.

use std::sync::Arc;

use pointpoker_types::{CollectionPath, DocumentPath, MemberRecord, Room, RoomId, RoomRecord, UserIdentity};
use tracing::{debug, warn};

use crate::draft::RoomDraft;
use crate::error::PokerError;
use crate::feed::{FeedEvent, decode_batch};
use crate::identity::Viewer;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::store::{ChangeBatch, Document, Mutation, StoreError};

/// What the home screen renders.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryView {
    pub rooms: Arc<Vec<Room>>,
    pub is_loading: bool,
    /// Sticky until the next successful update.
    pub error: Option<StoreError>,
}

impl Default for DirectoryView {
    fn default() -> Self {
        Self {
            rooms: Arc::new(Vec::new()),
            is_loading: true,
            error: None,
        }
    }
}

impl DirectoryView {
    pub fn get(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == *id)
    }

    /// Rooms whose name contains `query`, ignoring case. A blank query
    /// matches everything.
    pub fn filter(&self, query: &str) -> Vec<&Room> {
        let query = query.trim().to_lowercase();
        self.rooms
            .iter()
            .filter(|r| query.is_empty() || r.name.to_lowercase().contains(&query))
            .collect()
    }

    /// The room the viewer joined last, if it still exists.
    pub fn recent_room(&self) -> Option<&Room> {
        self.rooms.iter().find(|r| r.recent)
    }
}

/// Reducer state behind [`DirectoryView`].
#[derive(Debug, Default)]
pub struct DirectorySync {
    rooms: Reconciler<Room>,
    is_loading: bool,
    error: Option<StoreError>,
}

impl DirectorySync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one feed event into the state.
    pub fn reduce(&mut self, event: FeedEvent<ChangeBatch>, viewer: &Viewer) -> ReconcileReport {
        match event {
            FeedEvent::Started => {
                self.is_loading = true;
                ReconcileReport::default()
            }
            FeedEvent::Update(batch) => {
                let changes = decode_batch(batch, |doc| decode_room(doc, viewer));
                let report = self.rooms.apply(changes);
                if !report.skipped.is_empty() {
                    debug!(skipped = report.skipped.len(), "directory batch had skipped changes");
                }
                self.is_loading = false;
                self.error = None;
                report
            }
            FeedEvent::Failed(e) => {
                warn!(error = %e, "room directory subscription failed");
                self.is_loading = false;
                self.error = Some(e);
                ReconcileReport::default()
            }
        }
    }

    pub fn version(&self) -> u64 {
        self.rooms.version()
    }

    /// Build the view, deriving `owner` and `recent` for the current viewer.
    pub fn view(&self, viewer: &Viewer) -> DirectoryView {
        let rooms = self
            .rooms
            .snapshot()
            .iter()
            .cloned()
            .map(|mut room| {
                room.owner = viewer.user_id.as_ref().is_some_and(|u| *u == room.leader);
                room.recent = viewer.recent_room.as_ref().is_some_and(|r| *r == room.id);
                room
            })
            .collect();
        DirectoryView {
            rooms: Arc::new(rooms),
            is_loading: self.is_loading,
            error: self.error.clone(),
        }
    }
}

pub(crate) fn decode_room(doc: Document, viewer: &Viewer) -> Result<Room, StoreError> {
    let record = RoomRecord::from_fields(&doc.fields)?;
    Ok(Room::from_record(
        RoomId::new(doc.id),
        record,
        viewer.user_id.as_ref(),
        viewer.recent_room.as_ref(),
    ))
}

/// Write a new room led by `leader`.
pub fn plan_create_room(leader: &UserIdentity, draft: &RoomDraft) -> Result<Mutation, PokerError> {
    draft.validate()?;
    let record = RoomRecord::new(draft.name.clone(), leader.id.clone(), draft.scale().clone());
    Ok(Mutation::Add {
        collection: CollectionPath::rooms(),
        fields: record.to_fields()?,
    })
}

/// Write the member document for `identity`, without a vote.
pub fn plan_join(room_id: &RoomId, identity: &UserIdentity) -> Result<Mutation, PokerError> {
    Ok(Mutation::Set {
        path: DocumentPath::member(room_id, &identity.id),
        fields: MemberRecord::joined(identity.display_name.clone()).to_fields()?,
    })
}

/// Delete the room document. Its members are left to the backend.
pub fn plan_remove(room_id: &RoomId) -> Mutation {
    Mutation::Delete {
        path: DocumentPath::room(room_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ChangeKind, DocumentChange};
    use pointpoker_types::{PointScale, UserId};

    fn room_doc(kind: ChangeKind, id: &str, name: &str, leader: &str) -> DocumentChange {
        let record = RoomRecord::new(name, UserId::new(leader), PointScale::from_values([1.0, 2.0]));
        DocumentChange {
            kind,
            document: Document {
                id: id.to_string(),
                fields: record.to_fields().unwrap(),
            },
        }
    }

    fn viewer(user: &str, recent: Option<&str>) -> Viewer {
        Viewer {
            user_id: Some(UserId::new(user)),
            user_name: "Alice".into(),
            recent_room: recent.map(RoomId::new),
        }
    }

    #[test]
    fn test_started_then_update() {
        let mut sync = DirectorySync::new();
        let v = viewer("u1", None);
        sync.reduce(FeedEvent::Started, &v);
        assert!(sync.view(&v).is_loading);

        sync.reduce(
            FeedEvent::Update(ChangeBatch::new(vec![
                room_doc(ChangeKind::Added, "r1", "Sprint 1", "u1"),
                room_doc(ChangeKind::Added, "r2", "Sprint 2", "u2"),
            ])),
            &v,
        );
        let view = sync.view(&v);
        assert!(!view.is_loading);
        assert_eq!(view.rooms.len(), 2);
        assert!(view.rooms[0].owner);
        assert!(!view.rooms[1].owner);
    }

    #[test]
    fn test_error_is_sticky_until_update() {
        let mut sync = DirectorySync::new();
        let v = viewer("u1", None);
        sync.reduce(FeedEvent::Failed(StoreError::Unavailable("offline".into())), &v);
        let view = sync.view(&v);
        assert!(!view.is_loading);
        assert_eq!(view.error, Some(StoreError::Unavailable("offline".into())));

        sync.reduce(FeedEvent::Started, &v);
        assert!(sync.view(&v).error.is_some());

        sync.reduce(FeedEvent::Update(ChangeBatch::default()), &v);
        assert!(sync.view(&v).error.is_none());
    }

    #[test]
    fn test_recent_follows_viewer() {
        let mut sync = DirectorySync::new();
        let before = viewer("u1", None);
        sync.reduce(
            FeedEvent::Update(ChangeBatch::new(vec![room_doc(ChangeKind::Added, "r1", "A", "u2")])),
            &before,
        );
        assert!(sync.view(&before).recent_room().is_none());

        let after = viewer("u1", Some("r1"));
        assert_eq!(sync.view(&after).recent_room().map(|r| r.id.as_str()), Some("r1"));
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let mut sync = DirectorySync::new();
        let v = viewer("u1", None);
        sync.reduce(
            FeedEvent::Update(ChangeBatch::new(vec![
                room_doc(ChangeKind::Added, "r1", "Backend Sprint", "u1"),
                room_doc(ChangeKind::Added, "r2", "Design review", "u1"),
            ])),
            &v,
        );
        let view = sync.view(&v);
        let names: Vec<_> = view.filter("SPRINT").iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, ["Backend Sprint"]);
        assert_eq!(view.filter("  ").len(), 2);
        assert!(view.filter("retro").is_empty());
    }

    #[test]
    fn test_modified_room_keeps_position() {
        let mut sync = DirectorySync::new();
        let v = viewer("u1", None);
        sync.reduce(
            FeedEvent::Update(ChangeBatch::new(vec![
                room_doc(ChangeKind::Added, "r1", "A", "u1"),
                room_doc(ChangeKind::Added, "r2", "B", "u1"),
            ])),
            &v,
        );
        sync.reduce(
            FeedEvent::Update(ChangeBatch::new(vec![room_doc(ChangeKind::Modified, "r1", "A2", "u1")])),
            &v,
        );
        let view = sync.view(&v);
        assert_eq!(view.rooms[0].name, "A2");
        assert_eq!(view.rooms[1].name, "B");
    }

    #[test]
    fn test_plan_create_room() {
        let leader = UserIdentity::new(UserId::new("u1"), "Alice");
        let draft = RoomDraft::with_scale("Sprint", PointScale::from_values([1.0, 3.0]));
        let mutation = plan_create_room(&leader, &draft).unwrap();
        match mutation {
            Mutation::Add { collection, fields } => {
                assert_eq!(collection, CollectionPath::rooms());
                let record = RoomRecord::from_fields(&fields).unwrap();
                assert_eq!(record.leader, leader.id);
                assert_eq!(record.points.values(), &[1.0, 3.0]);
                assert!(record.average_point.is_none());
            }
            other => panic!("expected add, got {other:?}"),
        }

        let unnamed = RoomDraft::with_scale("", PointScale::from_values([1.0]));
        assert!(matches!(plan_create_room(&leader, &unnamed), Err(PokerError::InvalidInput(_))));
    }

    #[test]
    fn test_plan_join_and_remove() {
        let me = UserIdentity::new(UserId::new("u1"), "Alice");
        let room = RoomId::new("r1");
        assert_eq!(plan_join(&room, &me).unwrap().describe(), "set Rooms/r1/Members/u1");
        assert_eq!(plan_remove(&room).describe(), "delete Rooms/r1");
    }
}
