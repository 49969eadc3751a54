//! Tunable detector thresholds.
//!
//! Defaults are the values the detectors were calibrated with; operators may
//! override any of them from configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
  /// Minimum combined score for a duplicate-person pair.
  pub person_min_score:       f64,
  /// Minimum full-name similarity before a pair is scored at all.
  pub person_min_name_sim:    f64,
  /// Similarity at which two distinct place keys are clustered.
  pub place_min_similarity:   f64,
  /// Similarity at which two media filenames are considered the same.
  pub media_min_filename_sim: f64,
  /// Maximum relative size difference for duplicate assets.
  pub media_size_tolerance:   f64,
  /// Youngest plausible age of a parent at a child's birth.
  pub min_parent_age:         i32,
  /// Youngest plausible age of a spouse at marriage.
  pub min_marriage_age:       i32,
  /// Name values treated as "no name recorded".
  pub placeholder_names:      Vec<String>,
}

impl Default for DetectionSettings {
  fn default() -> Self {
    Self {
      person_min_score:       0.55,
      person_min_name_sim:    0.68,
      place_min_similarity:   0.8,
      media_min_filename_sim: 0.92,
      media_size_tolerance:   0.02,
      min_parent_age:         12,
      min_marriage_age:       12,
      placeholder_names:      ["unknown", "n/a", "na", "none"]
        .into_iter()
        .map(String::from)
        .collect(),
    }
  }
}

impl DetectionSettings {
  pub fn is_placeholder(&self, normalized: &str) -> bool {
    self.placeholder_names.iter().any(|p| p == normalized)
  }
}
