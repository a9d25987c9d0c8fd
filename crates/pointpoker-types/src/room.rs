//! Rooms and members as seen by the current viewer.
//!
//! These are derived from the stored records plus the local identity:
//! `owner`, `recent`, and `its_me` are never persisted.

use serde::{Deserialize, Serialize};

use crate::ids::{RoomId, UserId};
use crate::point::PointScale;
use crate::record::{MemberRecord, RoomRecord};

/// A planning-poker room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    /// The creator; fixed for the lifetime of the room.
    pub leader: UserId,
    pub point_scale: PointScale,
    /// `None` while voting is open.
    pub average_point: Option<f64>,
    /// Filled in once the roster is known.
    pub member_count: Option<usize>,
    /// The viewer is the leader.
    pub owner: bool,
    /// The viewer joined this room most recently.
    pub recent: bool,
}

impl Room {
    /// Derive the viewer's room from a stored record.
    pub fn from_record(
        id: RoomId,
        record: RoomRecord,
        viewer: Option<&UserId>,
        recent_room: Option<&RoomId>,
    ) -> Self {
        let owner = viewer.is_some_and(|v| *v == record.leader);
        let recent = recent_room.is_some_and(|r| *r == id);
        Self {
            id,
            name: record.name,
            leader: record.leader,
            point_scale: record.points,
            average_point: record.average_point,
            member_count: None,
            owner,
            recent,
        }
    }

    /// The stored form of this room, echoing the immutable fields.
    pub fn to_record(&self) -> RoomRecord {
        RoomRecord {
            name: self.name.clone(),
            leader: self.leader.clone(),
            points: self.point_scale.clone(),
            average_point: self.average_point,
        }
    }

    /// Votes are accepted until an average has been computed.
    pub fn voting_open(&self) -> bool {
        self.average_point.is_none()
    }
}

/// A member of a room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: UserId,
    pub name: String,
    /// `None` until the member votes.
    pub vote: Option<f64>,
    /// This row belongs to the viewer.
    pub its_me: bool,
}

impl Member {
    /// Derive a roster entry. A row is the viewer's when its name matches
    /// the viewer's display name.
    pub fn from_record(id: UserId, record: MemberRecord, viewer_name: &str) -> Self {
        let its_me = record.name == viewer_name;
        Self {
            id,
            name: record.name,
            vote: record.point,
            its_me,
        }
    }

    pub fn has_voted(&self) -> bool {
        self.vote.is_some()
    }
}
