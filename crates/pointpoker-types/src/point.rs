//! Point values and the point scale a room votes on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from editing a [`PointScale`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PointError {
    #[error("point value must be finite, got {0}")]
    NonFinite(f64),
    #[error("invalid point: {0:?}")]
    Unparseable(String),
}

/// Sorted, duplicate-free set of point values offered for voting.
///
/// Stored on the wire as a plain array (`points`). Reading a stored array
/// is lenient: non-finite values are dropped and the rest are sorted, so a
/// record written by an older client still yields a usable scale.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f64>", into = "Vec<f64>")]
pub struct PointScale(Vec<f64>);

impl PointScale {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build from arbitrary values, sorting and dropping duplicates.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut points: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).map(normalize).collect();
        points.sort_by(|a, b| a.total_cmp(b));
        points.dedup();
        Self(points)
    }

    /// Insert a value, keeping the scale sorted.
    ///
    /// Returns `Ok(false)` when the value was already present.
    pub fn insert(&mut self, value: f64) -> Result<bool, PointError> {
        if !value.is_finite() {
            return Err(PointError::NonFinite(value));
        }
        let value = normalize(value);
        match self.0.binary_search_by(|probe| probe.total_cmp(&value)) {
            Ok(_) => Ok(false),
            Err(idx) => {
                self.0.insert(idx, value);
                Ok(true)
            }
        }
    }

    /// Parse user input and insert it.
    pub fn insert_text(&mut self, text: &str) -> Result<bool, PointError> {
        let trimmed = text.trim();
        let value: f64 = trimmed
            .parse()
            .map_err(|_| PointError::Unparseable(text.to_string()))?;
        self.insert(value)
    }

    /// Remove a value. Returns whether it was present.
    pub fn remove(&mut self, value: f64) -> bool {
        let value = normalize(value);
        match self.0.binary_search_by(|probe| probe.total_cmp(&value)) {
            Ok(idx) => {
                self.0.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        let value = normalize(value);
        self.0.binary_search_by(|probe| probe.total_cmp(&value)).is_ok()
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `total_cmp` orders `-0.0` before `0.0`; store both as `0.0`.
fn normalize(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}

impl From<Vec<f64>> for PointScale {
    fn from(values: Vec<f64>) -> Self {
        Self::from_values(values)
    }
}

impl From<PointScale> for Vec<f64> {
    fn from(scale: PointScale) -> Vec<f64> {
        scale.0
    }
}

/// Render a point value without a trailing `.0` (`5`, `0.5`).
pub fn format_point(value: f64) -> String {
    value.to_string()
}

/// Render an average with at most two decimals (`5.33`, `4`).
pub fn format_average(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    rounded.to_string()
}
