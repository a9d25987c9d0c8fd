//! Local key-value preferences and the identity record stored in them.
//!
//! Preferences persist across sessions. Values are strings; reading an
//! absent key yields an empty string. The only keys this crate uses are
//! `user_id`, `user_name`, and `recent_room_id`, accessed through
//! [`IdentityStore`].
//!
//! The identity record is read by many components but written only by
//! identity resolution and join. Pass one `IdentityStore` into every
//! component that needs it instead of reaching for a global.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use pointpoker_types::{RoomId, UserId, UserIdentity};
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::{KEY_RECENT_ROOM_ID, KEY_USER_ID, KEY_USER_NAME};

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("preferences I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("preferences file is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

/// A persisted string key-value store.
pub trait Preferences: Send + Sync {
    /// Read a value; absent keys read as `""`.
    fn get(&self, key: &str) -> String;

    fn put(&self, key: &str, value: &str) -> Result<(), PrefsError>;

    /// Remove every key.
    fn clear(&self) -> Result<(), PrefsError>;
}

/// Volatile preferences, for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryPreferences {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Preferences for MemoryPreferences {
    fn get(&self, key: &str) -> String {
        self.values.read().get(key).cloned().unwrap_or_default()
    }

    fn put(&self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), PrefsError> {
        self.values.write().clear();
        Ok(())
    }
}

/// Preferences stored as a JSON object in a single file, written through on
/// every change.
pub struct FilePreferences {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FilePreferences {
    /// Open the file, starting empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PrefsError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no preferences file yet");
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl Preferences for FilePreferences {
    fn get(&self, key: &str) -> String {
        self.values.read().get(key).cloned().unwrap_or_default()
    }

    fn put(&self, key: &str, value: &str) -> Result<(), PrefsError> {
        let mut values = self.values.write();
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn clear(&self) -> Result<(), PrefsError> {
        let mut values = self.values.write();
        values.clear();
        self.persist(&values)
    }
}

/// Typed access to the identity record in [`Preferences`].
#[derive(Clone)]
pub struct IdentityStore {
    prefs: Arc<dyn Preferences>,
}

impl IdentityStore {
    pub fn new(prefs: Arc<dyn Preferences>) -> Self {
        Self { prefs }
    }

    /// Identity store over volatile preferences.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPreferences::new()))
    }

    /// The stored user id, if identity resolution has ever succeeded.
    pub fn user_id(&self) -> Option<UserId> {
        UserId::from_stored(&self.prefs.get(KEY_USER_ID))
    }

    /// The stored display name (`""` when unset).
    pub fn user_name(&self) -> String {
        self.prefs.get(KEY_USER_NAME)
    }

    /// The stored identity, when an id has been assigned.
    pub fn identity(&self) -> Option<UserIdentity> {
        self.user_id().map(|id| UserIdentity::new(id, self.user_name()))
    }

    /// The room joined most recently.
    pub fn recent_room(&self) -> Option<RoomId> {
        RoomId::from_stored(&self.prefs.get(KEY_RECENT_ROOM_ID))
    }

    /// Record a freshly created identity.
    pub fn save_identity(&self, identity: &UserIdentity) -> Result<(), PrefsError> {
        if let Some(existing) = self.user_id() {
            if existing != identity.id {
                warn!(existing = %existing, new = %identity.id, "replacing stored user id");
            }
        }
        self.prefs.put(KEY_USER_ID, identity.id.as_str())?;
        self.prefs.put(KEY_USER_NAME, &identity.display_name)
    }

    pub fn save_name(&self, name: &str) -> Result<(), PrefsError> {
        self.prefs.put(KEY_USER_NAME, name)
    }

    pub fn save_recent_room(&self, room_id: &RoomId) -> Result<(), PrefsError> {
        self.prefs.put(KEY_RECENT_ROOM_ID, room_id.as_str())
    }

    /// Forget everything, including the identity.
    pub fn clear(&self) -> Result<(), PrefsError> {
        self.prefs.clear()
    }
}

impl std::fmt::Debug for IdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityStore")
            .field("user_id", &self.user_id())
            .field("user_name", &self.user_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_key_reads_empty() {
        let prefs = MemoryPreferences::new();
        assert_eq!(prefs.get("missing"), "");
    }

    #[test]
    fn test_identity_roundtrip() {
        let store = IdentityStore::in_memory();
        assert!(store.identity().is_none());
        assert_eq!(store.user_name(), "");

        let identity = UserIdentity::new(UserId::new("u1"), "Alice");
        store.save_identity(&identity).unwrap();
        assert_eq!(store.identity(), Some(identity));

        store.save_name("Alicia").unwrap();
        assert_eq!(store.user_name(), "Alicia");
        assert_eq!(store.user_id(), Some(UserId::new("u1")));
    }

    #[test]
    fn test_recent_room() {
        let store = IdentityStore::in_memory();
        assert_eq!(store.recent_room(), None);
        store.save_recent_room(&RoomId::new("r1")).unwrap();
        assert_eq!(store.recent_room(), Some(RoomId::new("r1")));
    }

    #[test]
    fn test_clear_forgets_identity() {
        let store = IdentityStore::in_memory();
        store.save_identity(&UserIdentity::new(UserId::new("u1"), "A")).unwrap();
        store.clear().unwrap();
        assert!(store.identity().is_none());
    }

    #[test]
    fn test_file_preferences_persist_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let prefs = FilePreferences::open(&path).unwrap();
        prefs.put(KEY_USER_ID, "u1").unwrap();
        prefs.put(KEY_USER_NAME, "Alice").unwrap();
        drop(prefs);

        let reopened = FilePreferences::open(&path).unwrap();
        assert_eq!(reopened.get(KEY_USER_ID), "u1");
        assert_eq!(reopened.get(KEY_USER_NAME), "Alice");
        assert_eq!(reopened.get(KEY_RECENT_ROOM_ID), "");
    }

    #[test]
    fn test_file_preferences_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(FilePreferences::open(&path), Err(PrefsError::Json(_))));
    }
}
