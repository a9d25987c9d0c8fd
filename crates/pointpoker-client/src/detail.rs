//! Room detail: one room document, replaced wholesale on every snapshot.

use pointpoker_types::{Room, RoomId};
use tracing::{debug, warn};

use crate::directory::decode_room;
use crate::feed::FeedEvent;
use crate::identity::Viewer;
use crate::store::{Document, StoreError};

/// The room as the detail screen sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    /// `None` before the first snapshot or after the room was deleted.
    pub room: Option<Room>,
    pub is_loading: bool,
    pub error: Option<StoreError>,
}

impl Default for DetailView {
    fn default() -> Self {
        Self {
            room: None,
            is_loading: true,
            error: None,
        }
    }
}

/// Reducer state for a single room subscription.
#[derive(Debug)]
pub struct RoomDetailSync {
    room_id: RoomId,
    room: Option<Room>,
    is_loading: bool,
    error: Option<StoreError>,
}

impl RoomDetailSync {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            room: None,
            is_loading: false,
            error: None,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Fold one snapshot event into the state.
    pub fn reduce(&mut self, event: FeedEvent<Option<Document>>, viewer: &Viewer) {
        match event {
            FeedEvent::Started => self.is_loading = true,
            FeedEvent::Update(snapshot) => {
                self.room = match snapshot {
                    Some(doc) => match decode_room(doc, viewer) {
                        Ok(room) => Some(room),
                        Err(e) => {
                            warn!(room = %self.room_id, error = %e, "undecodable room snapshot");
                            self.room.take()
                        }
                    },
                    None => {
                        debug!(room = %self.room_id, "room does not exist");
                        None
                    }
                };
                self.is_loading = false;
                self.error = None;
            }
            FeedEvent::Failed(e) => {
                warn!(room = %self.room_id, error = %e, "room subscription failed");
                self.is_loading = false;
                self.error = Some(e);
            }
        }
    }

    /// Drop the loaded room, e.g. after leaving it.
    pub fn clear(&mut self) {
        self.room = None;
        self.error = None;
        self.is_loading = false;
    }

    /// Build the view with `owner` and `recent` recomputed for `viewer`.
    pub fn view(&self, viewer: &Viewer) -> DetailView {
        let room = self.room.clone().map(|mut room| {
            room.owner = viewer.user_id.as_ref().is_some_and(|u| *u == room.leader);
            room.recent = viewer.recent_room.as_ref().is_some_and(|r| *r == room.id);
            room
        });
        DetailView {
            room,
            is_loading: self.is_loading,
            error: self.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointpoker_types::{PointScale, RoomRecord, UserId};

    fn snapshot(average: Option<f64>) -> Option<Document> {
        let record = RoomRecord::new("Sprint", UserId::new("u1"), PointScale::from_values([1.0, 2.0]))
            .with_average(average);
        Some(Document {
            id: "r1".into(),
            fields: record.to_fields().unwrap(),
        })
    }

    fn viewer(user: Option<&str>) -> Viewer {
        Viewer {
            user_id: user.map(UserId::new),
            ..Viewer::default()
        }
    }

    #[test]
    fn test_snapshot_replaces_room() {
        let mut sync = RoomDetailSync::new(RoomId::new("r1"));
        let v = viewer(Some("u1"));
        sync.reduce(FeedEvent::Started, &v);
        assert!(sync.view(&v).is_loading);

        sync.reduce(FeedEvent::Update(snapshot(None)), &v);
        let view = sync.view(&v);
        assert!(!view.is_loading);
        assert!(view.room.as_ref().unwrap().voting_open());

        sync.reduce(FeedEvent::Update(snapshot(Some(3.0))), &v);
        assert_eq!(sync.view(&v).room.unwrap().average_point, Some(3.0));

        sync.reduce(FeedEvent::Update(None), &v);
        assert!(sync.view(&v).room.is_none());
    }

    #[test]
    fn test_owner_recomputed_per_view() {
        let mut sync = RoomDetailSync::new(RoomId::new("r1"));
        sync.reduce(FeedEvent::Update(snapshot(None)), &viewer(None));
        assert!(!sync.view(&viewer(None)).room.unwrap().owner);
        assert!(sync.view(&viewer(Some("u1"))).room.unwrap().owner);
        assert!(!sync.view(&viewer(Some("u2"))).room.unwrap().owner);
    }

    #[test]
    fn test_failure_keeps_last_room() {
        let mut sync = RoomDetailSync::new(RoomId::new("r1"));
        let v = viewer(Some("u1"));
        sync.reduce(FeedEvent::Update(snapshot(None)), &v);
        sync.reduce(FeedEvent::Failed(StoreError::PermissionDenied("rules".into())), &v);
        let view = sync.view(&v);
        assert!(view.room.is_some());
        assert_eq!(view.error, Some(StoreError::PermissionDenied("rules".into())));
    }

    #[test]
    fn test_clear() {
        let mut sync = RoomDetailSync::new(RoomId::new("r1"));
        let v = viewer(Some("u1"));
        sync.reduce(FeedEvent::Update(snapshot(None)), &v);
        sync.clear();
        assert_eq!(sync.view(&v), DetailView { room: None, is_loading: false, error: None });
    }
}
