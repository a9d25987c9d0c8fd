//! Finalizing a voting round.
//!
//! Only members who voted count towards the mean; a member without a vote
//! is excluded from both the sum and the count. Writing the average is a
//! full overwrite of the room document, so the immutable fields are echoed
//! from the caller's snapshot.

use pointpoker_types::{DocumentPath, Member, Room};
use tracing::debug;

use crate::error::PokerError;
use crate::store::Mutation;

/// Mean of the votes that were cast.
pub fn compute_average(members: &[Member]) -> Result<f64, PokerError> {
    let (sum, count) = members
        .iter()
        .filter_map(|m| m.vote)
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return Err(PokerError::NoVotes);
    }
    Ok(sum / count as f64)
}

/// Write the average into the room, closing the round.
pub fn plan_finalize(room: &Room, members: &[Member]) -> Result<(f64, Mutation), PokerError> {
    let average = compute_average(members)?;
    debug!(room = %room.id, average, voters = members.iter().filter(|m| m.has_voted()).count(), "finalizing");
    let fields = room.to_record().with_average(Some(average)).to_fields()?;
    Ok((
        average,
        Mutation::Set {
            path: DocumentPath::room(&room.id),
            fields,
        },
    ))
}

/// Clear the average, reopening the round. Member votes are left as they are.
pub fn plan_reset(room: &Room) -> Result<Mutation, PokerError> {
    Ok(Mutation::Set {
        path: DocumentPath::room(&room.id),
        fields: room.to_record().with_average(None).to_fields()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointpoker_types::{PointScale, RoomId, RoomRecord, UserId};

    fn member(id: &str, vote: Option<f64>) -> Member {
        Member {
            id: UserId::new(id),
            name: id.to_uppercase(),
            vote,
            its_me: false,
        }
    }

    fn room(average: Option<f64>) -> Room {
        let record = RoomRecord::new("Sprint", UserId::new("lead"), PointScale::from_values([1.0, 3.0, 5.0, 8.0]))
            .with_average(average);
        Room::from_record(RoomId::new("r1"), record, None, None)
    }

    #[test]
    fn test_non_voters_excluded() {
        let members = [
            member("a", Some(5.0)),
            member("b", Some(3.0)),
            member("c", Some(8.0)),
            member("d", None),
        ];
        let avg = compute_average(&members).unwrap();
        assert!((avg - 16.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_votes() {
        assert!(matches!(compute_average(&[]), Err(PokerError::NoVotes)));
        assert!(matches!(compute_average(&[member("a", None)]), Err(PokerError::NoVotes)));
        assert!(matches!(plan_finalize(&room(None), &[member("a", None)]), Err(PokerError::NoVotes)));
    }

    #[test]
    fn test_finalize_echoes_room_fields() {
        let room = room(None);
        let (avg, mutation) = plan_finalize(&room, &[member("a", Some(2.0)), member("b", Some(3.0))]).unwrap();
        assert_eq!(avg, 2.5);
        match mutation {
            Mutation::Set { path, fields } => {
                assert_eq!(path, DocumentPath::room(&room.id));
                let record = RoomRecord::from_fields(&fields).unwrap();
                assert_eq!(record, room.to_record().with_average(Some(2.5)));
            }
            other => panic!("expected set, got {other:?}"),
        }
    }

    #[test]
    fn test_reset_then_finalize_round_trip() {
        let members = [member("a", Some(5.0)), member("b", Some(3.0)), member("c", Some(8.0))];
        let (first, _) = plan_finalize(&room(None), &members).unwrap();

        let closed = room(Some(first));
        let reset = plan_reset(&closed).unwrap();
        let Mutation::Set { fields, .. } = reset else {
            panic!("expected set");
        };
        let reopened = RoomRecord::from_fields(&fields).unwrap();
        assert!(reopened.average_point.is_none());
        assert!(!fields.contains_key("average_point"));

        let reopened = Room::from_record(closed.id.clone(), reopened, None, None);
        let (second, _) = plan_finalize(&reopened, &members).unwrap();
        assert_eq!(first, second);
    }
}
