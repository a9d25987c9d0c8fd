//! Shared identity, room, and member types for pointpoker.
//!
//! This crate is the vocabulary of the planning-poker client: typed ids,
//! the records persisted in the document store, the view entities the
//! client derives from them, and the paths that address them. It has
//! **no internal pointpoker dependencies**.
//!
//! # Logical Schema
//!
//! ```text
//! Rooms/{roomId}                   RoomRecord   { name, leader, points, average_point? }
//!     └── Members/{userId}         MemberRecord { name, point? }
//! Users/{userId}                   UserRecord   { name }
//! ```
//!
//! # Key Types
//!
//! |-------------------|----------------------------------------------|
//! | Type              | Purpose                                      |
//! |-------------------|----------------------------------------------|
//! | [`UserId`]        | Backend-assigned user identifier             |
//! | [`RoomId`]        | Backend-assigned room identifier             |
//! | [`UserIdentity`]  | Local identity (id + display name)           |
//! | [`RoomRecord`]    | Stored room document                         |
//! | [`MemberRecord`]  | Stored member document (name + vote)         |
//! | [`Room`]          | Room as seen by the current viewer           |
//! | [`Member`]        | Roster entry as seen by the current viewer   |
//! | [`PointScale`]    | Sorted, duplicate-free set of point values   |
//! |-------------------|----------------------------------------------|

pub mod ids;
pub mod identity;
pub mod path;
pub mod point;
pub mod record;
pub mod room;

pub use ids::{RoomId, UserId};
pub use identity::UserIdentity;
pub use path::{CollectionPath, DocumentPath};
pub use point::{PointError, PointScale, format_average, format_point};
pub use record::{Fields, MemberRecord, RecordError, RoomRecord, UserRecord};
pub use room::{Member, Room};
