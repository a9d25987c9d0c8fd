//! Client-facing error taxonomy.
//!
//! Every user action resolves to `Result<_, PokerError>`; the caller decides
//! what to show. Nothing here is fatal and nothing is retried
//! automatically. Reconcile anomalies (a change for an unknown id) are not
//! errors; see [`SkipReason`](crate::reconcile::SkipReason).

use thiserror::Error;

use crate::prefs::PrefsError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum PokerError {
    /// Empty name, empty room name, unparseable point, ...
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Creating or renaming the local user failed, or no identity exists
    /// for an action that needs one.
    #[error("identity error: {0}")]
    Identity(String),

    /// A mutation or subscription was rejected by the store.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(#[from] StoreError),

    /// An average was requested before anyone voted.
    #[error("no votes have been cast")]
    NoVotes,

    /// The room has not loaded yet, or no longer exists.
    #[error("room unavailable: {0}")]
    RoomUnavailable(String),

    #[error("preferences error: {0}")]
    Preferences(#[from] PrefsError),

    /// The client actor has stopped.
    #[error("client shut down")]
    Shutdown,
}

impl PokerError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        PokerError::InvalidInput(msg.into())
    }
}

impl From<pointpoker_types::PointError> for PokerError {
    fn from(e: pointpoker_types::PointError) -> Self {
        PokerError::InvalidInput(e.to_string())
    }
}

impl From<pointpoker_types::RecordError> for PokerError {
    fn from(e: pointpoker_types::RecordError) -> Self {
        PokerError::BackendUnavailable(StoreError::from(e))
    }
}
