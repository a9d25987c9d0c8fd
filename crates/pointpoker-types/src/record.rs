//! Records as persisted in the document store.
//!
//! Field names are part of the wire schema and must not change:
//!
//! - `Rooms/{roomId}`: `{ name, leader, points, average_point? }`
//! - `Rooms/{roomId}/Members/{userId}`: `{ name, point? }`
//! - `Users/{userId}`: `{ name }`
//!
//! Every write is a full-document overwrite, so a record always carries all
//! of its fields. Optional fields are omitted rather than written as null.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::UserId;
use crate::point::PointScale;

/// The raw field map of a stored document.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Error converting between a record and its field map.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record is not an object")]
    NotAnObject,
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// `Rooms/{roomId}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub name: String,
    pub leader: UserId,
    pub points: PointScale,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_point: Option<f64>,
}

/// `Rooms/{roomId}/Members/{userId}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<f64>,
}

/// `Users/{userId}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
}

impl RoomRecord {
    pub fn new(name: impl Into<String>, leader: UserId, points: PointScale) -> Self {
        Self {
            name: name.into(),
            leader,
            points,
            average_point: None,
        }
    }

    /// Copy with the average replaced; the immutable fields are echoed as-is.
    pub fn with_average(&self, average_point: Option<f64>) -> Self {
        Self {
            average_point,
            ..self.clone()
        }
    }
}

impl MemberRecord {
    /// A freshly joined member, no vote yet.
    pub fn joined(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            point: None,
        }
    }

    pub fn voted(name: impl Into<String>, point: f64) -> Self {
        Self {
            name: name.into(),
            point: Some(point),
        }
    }
}

impl UserRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

macro_rules! impl_record_fields {
    ($T:ty) => {
        impl $T {
            /// Encode into a document field map.
            pub fn to_fields(&self) -> Result<Fields, RecordError> {
                to_fields(self)
            }

            /// Decode from a document field map. Unknown fields are ignored.
            pub fn from_fields(fields: &Fields) -> Result<Self, RecordError> {
                from_fields(fields)
            }
        }
    };
}

impl_record_fields!(RoomRecord);
impl_record_fields!(MemberRecord);
impl_record_fields!(UserRecord);

fn to_fields<T: Serialize>(record: &T) -> Result<Fields, RecordError> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(RecordError::NotAnObject),
    }
}

fn from_fields<T: DeserializeOwned>(fields: &Fields) -> Result<T, RecordError> {
    Ok(serde_json::from_value(serde_json::Value::Object(fields.clone()))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: serde_json::Value) -> Fields {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_room_fields_match_schema() {
        let record = RoomRecord::new("Sprint 12", UserId::new("u1"), PointScale::from_values([1.0, 2.0]));
        let fields = record.to_fields().unwrap();
        assert_eq!(
            serde_json::Value::Object(fields),
            json!({ "name": "Sprint 12", "leader": "u1", "points": [1.0, 2.0] })
        );
    }

    #[test]
    fn test_room_average_written_when_set() {
        let record = RoomRecord::new("r", UserId::new("u1"), PointScale::new()).with_average(Some(4.5));
        let fields = record.to_fields().unwrap();
        assert_eq!(fields.get("average_point"), Some(&json!(4.5)));
        assert!(!fields.contains_key("averagePoint"));
    }

    #[test]
    fn test_room_decodes_integer_points_and_ignores_extra_fields() {
        let fields = object(json!({
            "name": "r",
            "leader": "u1",
            "points": [5, 1, 3],
            "owner": true,
            "average_point": 3
        }));
        let record = RoomRecord::from_fields(&fields).unwrap();
        assert_eq!(record.points.values(), &[1.0, 3.0, 5.0]);
        assert_eq!(record.average_point, Some(3.0));
    }

    #[test]
    fn test_room_missing_leader_is_malformed() {
        let fields = object(json!({ "name": "r", "points": [] }));
        assert!(matches!(RoomRecord::from_fields(&fields), Err(RecordError::Malformed(_))));
    }

    #[test]
    fn test_member_vote_optional() {
        let joined = MemberRecord::joined("Alice").to_fields().unwrap();
        assert_eq!(serde_json::Value::Object(joined), json!({ "name": "Alice" }));

        let voted = MemberRecord::voted("Alice", 3.0).to_fields().unwrap();
        assert_eq!(serde_json::Value::Object(voted), json!({ "name": "Alice", "point": 3.0 }));
    }

    #[test]
    fn test_user_record() {
        let fields = UserRecord::new("Bob").to_fields().unwrap();
        assert_eq!(UserRecord::from_fields(&fields).unwrap(), UserRecord::new("Bob"));
    }
}
