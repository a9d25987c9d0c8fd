//! Identity resolution: make sure the local user exists before acting.
//!
//! ```text
//!  NoIdentity ──ensure(name)──▶ Created(name)
//!  Created(a) ──ensure(b)─────▶ Renamed(b)       (a != b)
//!  Created(a) ──ensure(a)─────▶ Unchanged(a)     (no store call)
//! ```
//!
//! Creating a room, joining, and voting all await [`ensure_identity`] first
//! and abort when it fails, so the store never sees a member or room that
//! references an id the client has not persisted.

use pointpoker_types::{CollectionPath, DocumentPath, RoomId, UserId, UserIdentity, UserRecord};
use tracing::{info, instrument};

use crate::error::PokerError;
use crate::prefs::IdentityStore;
use crate::store::{DocumentStore, Mutation};

/// What [`ensure_identity`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityTransition {
    Created(UserIdentity),
    Renamed { identity: UserIdentity, previous: String },
    Unchanged(UserIdentity),
}

impl IdentityTransition {
    pub fn identity(&self) -> &UserIdentity {
        match self {
            IdentityTransition::Created(identity)
            | IdentityTransition::Renamed { identity, .. }
            | IdentityTransition::Unchanged(identity) => identity,
        }
    }

    pub fn into_identity(self) -> UserIdentity {
        match self {
            IdentityTransition::Created(identity)
            | IdentityTransition::Renamed { identity, .. }
            | IdentityTransition::Unchanged(identity) => identity,
        }
    }
}

/// The store call identity resolution needs, decided without I/O.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityPlan {
    /// No stored id: create a user document.
    Create { name: String, mutation: Mutation },
    /// Stored name differs: overwrite the user document.
    Rename { identity: UserIdentity, previous: String, mutation: Mutation },
    /// Already consistent.
    Keep(UserIdentity),
}

/// Decide what `candidate` requires given the stored identity.
pub fn plan_identity(stored: Option<UserIdentity>, candidate: &str) -> Result<IdentityPlan, PokerError> {
    if candidate.is_empty() {
        return Err(PokerError::invalid("name is empty"));
    }
    let fields = UserRecord::new(candidate).to_fields()?;

    Ok(match stored {
        None => IdentityPlan::Create {
            name: candidate.to_string(),
            mutation: Mutation::Add {
                collection: CollectionPath::users(),
                fields,
            },
        },
        Some(identity) if identity.display_name != candidate => IdentityPlan::Rename {
            mutation: Mutation::Set {
                path: DocumentPath::user(&identity.id),
                fields,
            },
            previous: identity.display_name,
            identity: UserIdentity::new(identity.id, candidate),
        },
        Some(identity) => IdentityPlan::Keep(identity),
    })
}

/// Create or rename the local user so its stored name is `candidate`.
#[instrument(skip(store, identities))]
pub async fn ensure_identity(
    store: &dyn DocumentStore,
    identities: &IdentityStore,
    candidate: &str,
) -> Result<IdentityTransition, PokerError> {
    match plan_identity(identities.identity(), candidate)? {
        IdentityPlan::Create { name, mutation } => {
            let id = mutation
                .apply(store)
                .await
                .map_err(|e| PokerError::Identity(format!("create user failed: {e}")))?
                .ok_or_else(|| PokerError::Identity("store returned no user id".into()))?;
            let identity = UserIdentity::new(UserId::new(id), name);
            identities.save_identity(&identity)?;
            info!(user = %identity, "created identity");
            Ok(IdentityTransition::Created(identity))
        }
        IdentityPlan::Rename { identity, previous, mutation } => {
            mutation
                .apply(store)
                .await
                .map_err(|e| PokerError::Identity(format!("rename user failed: {e}")))?;
            identities.save_name(&identity.display_name)?;
            info!(user = %identity, previous = %previous, "renamed identity");
            Ok(IdentityTransition::Renamed { identity, previous })
        }
        IdentityPlan::Keep(identity) => Ok(IdentityTransition::Unchanged(identity)),
    }
}

/// The stored identity, for actions that need one but take no name.
pub fn require_identity(identities: &IdentityStore) -> Result<UserIdentity, PokerError> {
    identities
        .identity()
        .ok_or_else(|| PokerError::Identity("no local identity; join or create a room first".into()))
}

/// Who is looking: the inputs for `owner`, `recent`, and `its_me`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Option<UserId>,
    pub user_name: String,
    pub recent_room: Option<RoomId>,
}

impl Viewer {
    pub fn from_store(identities: &IdentityStore) -> Self {
        Self {
            user_id: identities.user_id(),
            user_name: identities.user_name(),
            recent_room: identities.recent_room(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::{MemoryStore, OpKind};

    #[test]
    fn test_plan_rejects_empty_name() {
        assert!(matches!(plan_identity(None, ""), Err(PokerError::InvalidInput(_))));
    }

    #[test]
    fn test_plan_create_rename_keep() {
        assert!(matches!(plan_identity(None, "A"), Ok(IdentityPlan::Create { .. })));

        let stored = UserIdentity::new(UserId::new("u1"), "A");
        match plan_identity(Some(stored.clone()), "B").unwrap() {
            IdentityPlan::Rename { identity, previous, mutation } => {
                assert_eq!(identity, UserIdentity::new(UserId::new("u1"), "B"));
                assert_eq!(previous, "A");
                assert_eq!(mutation.describe(), "set Users/u1");
            }
            other => panic!("expected rename, got {other:?}"),
        }

        assert_eq!(plan_identity(Some(stored.clone()), "A").unwrap(), IdentityPlan::Keep(stored));
    }

    #[tokio::test]
    async fn test_ensure_identity_is_idempotent() {
        let store = MemoryStore::new();
        let identities = IdentityStore::in_memory();

        let first = ensure_identity(&store, &identities, "Alice").await.unwrap();
        assert!(matches!(first, IdentityTransition::Created(_)));
        let second = ensure_identity(&store, &identities, "Alice").await.unwrap();
        assert!(matches!(second, IdentityTransition::Unchanged(_)));

        assert_eq!(store.count_ops(OpKind::Add, "Users"), 1);
        assert_eq!(store.count_ops(OpKind::Set, "Users"), 0);
        assert_eq!(first.identity(), second.identity());
    }

    #[tokio::test]
    async fn test_rename_keeps_id() {
        let store = MemoryStore::new();
        let identities = IdentityStore::in_memory();

        let created = ensure_identity(&store, &identities, "Alice").await.unwrap().into_identity();
        let renamed = ensure_identity(&store, &identities, "Alicia").await.unwrap();
        assert_eq!(renamed.identity().id, created.id);
        assert_eq!(identities.user_name(), "Alicia");

        let stored = store.get(&DocumentPath::user(&created.id)).unwrap();
        assert_eq!(UserRecord::from_fields(&stored).unwrap().name, "Alicia");
    }

    #[tokio::test]
    async fn test_create_failure_persists_nothing() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let identities = IdentityStore::in_memory();

        let err = ensure_identity(&store, &identities, "Alice").await.unwrap_err();
        assert!(matches!(err, PokerError::Identity(_)));
        assert!(identities.identity().is_none());
    }

    #[tokio::test]
    async fn test_rename_failure_keeps_old_name() {
        let store = MemoryStore::new();
        let identities = IdentityStore::in_memory();
        ensure_identity(&store, &identities, "Alice").await.unwrap();

        store.set_offline(true);
        assert!(ensure_identity(&store, &identities, "Bob").await.is_err());
        assert_eq!(identities.user_name(), "Alice");
    }

    #[test]
    fn test_require_identity() {
        let identities = IdentityStore::in_memory();
        assert!(matches!(require_identity(&identities), Err(PokerError::Identity(_))));
    }
}
