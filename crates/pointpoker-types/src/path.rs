//! Collection and document paths for the logical schema.
//!
//! Paths are slash-separated, alternating collection and document
//! segments: `Rooms`, `Rooms/{roomId}`, `Rooms/{roomId}/Members/{userId}`.

use std::fmt;

use crate::ids::{RoomId, UserId};

pub const ROOMS: &str = "Rooms";
pub const MEMBERS: &str = "Members";
pub const USERS: &str = "Users";

/// Path to a collection of documents.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollectionPath(String);

/// Path to a single document inside a collection.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct DocumentPath {
    collection: CollectionPath,
    id: String,
}

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// `Rooms`
    pub fn rooms() -> Self {
        Self(ROOMS.to_string())
    }

    /// `Users`
    pub fn users() -> Self {
        Self(USERS.to_string())
    }

    /// `Rooms/{roomId}/Members`
    pub fn members(room_id: &RoomId) -> Self {
        Self(format!("{ROOMS}/{room_id}/{MEMBERS}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address a document inside this collection.
    pub fn doc(&self, id: impl Into<String>) -> DocumentPath {
        DocumentPath {
            collection: self.clone(),
            id: id.into(),
        }
    }
}

impl DocumentPath {
    /// `Rooms/{roomId}`
    pub fn room(room_id: &RoomId) -> Self {
        CollectionPath::rooms().doc(room_id.as_str())
    }

    /// `Rooms/{roomId}/Members/{userId}`
    pub fn member(room_id: &RoomId, user_id: &UserId) -> Self {
        CollectionPath::members(room_id).doc(user_id.as_str())
    }

    /// `Users/{userId}`
    pub fn user(user_id: &UserId) -> Self {
        CollectionPath::users().doc(user_id.as_str())
    }

    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
