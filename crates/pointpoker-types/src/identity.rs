//! The local user identity.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// The identity of the person using this installation.
///
/// `id` is assigned by the store on first creation and never changes;
/// `display_name` can be changed later through a rename.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub display_name: String,
}

impl UserIdentity {
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

impl std::fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id.short())
    }
}
