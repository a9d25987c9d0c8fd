//! Client configuration constants.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

/// Preference key for the store-assigned user id.
pub const KEY_USER_ID: &str = "user_id";

/// Preference key for the user's display name.
pub const KEY_USER_NAME: &str = "user_name";

/// Preference key for the id of the room joined most recently.
pub const KEY_RECENT_ROOM_ID: &str = "recent_room_id";

/// Point scale offered when creating a room.
pub const DEFAULT_POINT_SCALE: [f64; 6] = [0.5, 1.0, 1.5, 2.0, 3.0, 5.0];

/// Shown instead of another member's vote while voting is open.
pub const MASK_PLACEHOLDER: &str = "?";

/// Directory name under the platform config/data dirs.
pub const APP_DIR: &str = "pointpoker";

/// Config file name inside the config dir.
pub const CONFIG_FILE: &str = "client.ron";

/// Preferences file name inside the data dir.
pub const PREFERENCES_FILE: &str = "prefs.json";
