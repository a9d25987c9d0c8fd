//! The create-room form: a name plus an editable point scale.

use pointpoker_types::PointScale;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::PokerError;

/// A room being composed before it is created.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomDraft {
    pub name: String,
    scale: PointScale,
}

impl RoomDraft {
    /// Start from the configured default scale.
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_scale("", config.default_point_scale.clone())
    }

    pub fn with_scale(name: impl Into<String>, scale: PointScale) -> Self {
        Self {
            name: name.into(),
            scale,
        }
    }

    pub fn scale(&self) -> &PointScale {
        &self.scale
    }

    /// Parse `text` and add it to the scale, keeping it sorted.
    pub fn add_point(&mut self, text: &str) -> Result<(), PokerError> {
        let added = self
            .scale
            .insert_text(text)
            .map_err(|_| PokerError::invalid("invalid point"))?;
        if !added {
            debug!(text, "point already in scale");
        }
        Ok(())
    }

    /// Remove a value from the scale. Returns whether it was present.
    pub fn remove_point(&mut self, value: f64) -> bool {
        self.scale.remove(value)
    }

    /// Check the draft can be submitted.
    pub fn validate(&self) -> Result<(), PokerError> {
        if self.name.is_empty() {
            return Err(PokerError::invalid("room name is empty"));
        }
        if self.scale.is_empty() {
            return Err(PokerError::invalid("point scale is empty"));
        }
        Ok(())
    }
}
