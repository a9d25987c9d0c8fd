//! Member roster of one room, and what each viewer may see of the votes.
//!
//! # Blind voting
//!
//! |-----------------|-------------------|--------------------------|
//! | Room            | Own row           | Other rows               |
//! |-----------------|-------------------|--------------------------|
//! | average unset   | vote, or blank    | `?` if voted, else blank |
//! | average set     | vote, or blank    | vote, or blank           |
//! |-----------------|-------------------|--------------------------|
//!
//! Masking happens only at render time. Members hold their real votes so
//! the leader's average can be computed from the same roster.

use std::fmt;
use std::sync::Arc;

use pointpoker_types::{
    DocumentPath, Member, MemberRecord, RoomId, UserId, UserIdentity, format_point,
};
use tracing::{debug, warn};

use crate::constants::MASK_PLACEHOLDER;
use crate::error::PokerError;
use crate::feed::{FeedEvent, decode_batch};
use crate::identity::Viewer;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::store::{ChangeBatch, Document, Mutation, StoreError};

/// What a viewer sees in a member's vote column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoteDisplay {
    /// No vote cast.
    Blank,
    /// Voted, but hidden from this viewer.
    Masked,
    Shown(f64),
}

impl VoteDisplay {
    /// Render with a custom placeholder for hidden votes.
    pub fn render(&self, mask: &str) -> String {
        match self {
            VoteDisplay::Blank => String::new(),
            VoteDisplay::Masked => mask.to_string(),
            VoteDisplay::Shown(v) => format_point(*v),
        }
    }
}

impl fmt::Display for VoteDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(MASK_PLACEHOLDER))
    }
}

/// Apply the blind-voting rule to one member.
pub fn visible_vote(member: &Member, voting_closed: bool) -> VoteDisplay {
    match member.vote {
        None => VoteDisplay::Blank,
        Some(v) if voting_closed || member.its_me => VoteDisplay::Shown(v),
        Some(_) => VoteDisplay::Masked,
    }
}

/// One rendered roster row.
#[derive(Debug, Clone, PartialEq)]
pub struct BallotLine {
    pub member_id: UserId,
    pub name: String,
    pub its_me: bool,
    pub vote: VoteDisplay,
}

impl fmt::Display for BallotLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.vote)
    }
}

/// Render the roster for the viewer, given the room's current average.
pub fn render_ballot(members: &[Member], average_point: Option<f64>) -> Vec<BallotLine> {
    let closed = average_point.is_some();
    members
        .iter()
        .map(|m| BallotLine {
            member_id: m.id.clone(),
            name: m.name.clone(),
            its_me: m.its_me,
            vote: visible_vote(m, closed),
        })
        .collect()
}

/// The roster as a screen sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterView {
    pub members: Arc<Vec<Member>>,
    pub is_loading: bool,
    pub error: Option<StoreError>,
}

impl Default for RosterView {
    fn default() -> Self {
        Self {
            members: Arc::new(Vec::new()),
            is_loading: true,
            error: None,
        }
    }
}

impl RosterView {
    /// The viewer's own row.
    pub fn me(&self) -> Option<&Member> {
        self.members.iter().find(|m| m.its_me)
    }

    pub fn voted_count(&self) -> usize {
        self.members.iter().filter(|m| m.has_voted()).count()
    }
}

/// Reducer state for a room's `Members` feed.
#[derive(Debug)]
pub struct MemberRosterSync {
    room_id: RoomId,
    members: Reconciler<Member>,
    is_loading: bool,
    error: Option<StoreError>,
}

impl MemberRosterSync {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            members: Reconciler::new(),
            is_loading: false,
            error: None,
        }
    }

    pub fn reduce(&mut self, event: FeedEvent<ChangeBatch>, viewer: &Viewer) -> ReconcileReport {
        match event {
            FeedEvent::Started => {
                self.is_loading = true;
                ReconcileReport::default()
            }
            FeedEvent::Update(batch) => {
                let changes = decode_batch(batch, |doc| decode_member(doc, viewer));
                let report = self.members.apply(changes);
                debug!(
                    room = %self.room_id,
                    added = report.added,
                    modified = report.modified,
                    removed = report.removed,
                    "roster batch applied"
                );
                self.is_loading = false;
                self.error = None;
                report
            }
            FeedEvent::Failed(e) => {
                warn!(room = %self.room_id, error = %e, "roster subscription failed");
                self.is_loading = false;
                self.error = Some(e);
                ReconcileReport::default()
            }
        }
    }

    pub fn clear(&mut self) {
        self.members.clear();
        self.error = None;
        self.is_loading = false;
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Build the view with `its_me` recomputed for the viewer's name.
    pub fn view(&self, viewer: &Viewer) -> RosterView {
        let members = self
            .members
            .snapshot()
            .iter()
            .cloned()
            .map(|mut m| {
                m.its_me = m.name == viewer.user_name;
                m
            })
            .collect();
        RosterView {
            members: Arc::new(members),
            is_loading: self.is_loading,
            error: self.error.clone(),
        }
    }
}

fn decode_member(doc: Document, viewer: &Viewer) -> Result<Member, StoreError> {
    let record = MemberRecord::from_fields(&doc.fields)?;
    Ok(Member::from_record(UserId::new(doc.id), record, &viewer.user_name))
}

/// Overwrite the viewer's member document with a vote.
pub fn plan_vote(room_id: &RoomId, identity: &UserIdentity, point: f64) -> Result<Mutation, PokerError> {
    if !point.is_finite() {
        return Err(PokerError::invalid("invalid point"));
    }
    Ok(Mutation::Set {
        path: DocumentPath::member(room_id, &identity.id),
        fields: MemberRecord::voted(identity.display_name.clone(), point).to_fields()?,
    })
}

/// Delete the viewer's own member document.
pub fn plan_leave(room_id: &RoomId, user_id: &UserId) -> Mutation {
    Mutation::Delete {
        path: DocumentPath::member(room_id, user_id),
    }
}
