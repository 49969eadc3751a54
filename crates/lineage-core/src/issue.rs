//! Data-quality issues, as reported by the detectors.
//!
//! An issue references entities softly through `entity_ids`; it outlives the
//! deletion of those entities. The explanation is a typed document whose
//! shape depends on the issue type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{
  date::{DateField, Precision, Qualifier},
  graph::{EntityKind, MediaStatus},
};

// ─── Discriminants ───────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueType {
  DuplicatePerson,
  DuplicateFamily,
  DuplicateMediaLink,
  DuplicateMediaAsset,
  NameStandardization,
  PlaceCluster,
  DateNormalization,
  OrphanEvent,
  OrphanFamily,
  ImpossibleTimeline,
  ParentChildAge,
  ParentDeathBeforeBirth,
  MarriageTimeline,
  PlaceholderName,
}

impl IssueType {
  pub fn is_duplicate(self) -> bool {
    matches!(
      self,
      Self::DuplicatePerson
        | Self::DuplicateFamily
        | Self::DuplicateMediaLink
        | Self::DuplicateMediaAsset
    )
  }

  /// Referential and timeline problems counted as integrity warnings.
  pub fn is_integrity(self) -> bool {
    matches!(
      self,
      Self::OrphanEvent
        | Self::OrphanFamily
        | Self::ImpossibleTimeline
        | Self::ParentChildAge
        | Self::ParentDeathBeforeBirth
        | Self::MarriageTimeline
    )
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
  Info,
  Warning,
  Error,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IssueStatus {
  #[default]
  Open,
  Resolved,
}

// ─── Explanations ────────────────────────────────────────────────────────────

/// One literal spelling inside a place cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantCount {
  pub value: String,
  pub count: usize,
}

/// How a place cluster was formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterMethod {
  /// Spellings that collapse to the same normalised key.
  SameKey,
  /// Two distinct keys whose similarity crossed the threshold.
  SimilarKeys,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyDuplicateReason {
  /// Same spouse pair, marriage year and marriage place.
  SameSpouses,
  /// Same spouse names but different person records.
  SpouseSwap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarriageProblem {
  /// The spouse was younger than the minimum age (or unborn) at marriage.
  BeforeSpouseAdult,
  AfterSpouseDeath,
}

/// A proposed rewrite of one name field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSuggestion {
  pub current:   String,
  pub suggested: String,
}

/// Structured evidence for an issue. The variant mirrors [`IssueType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Explanation {
  DuplicatePerson {
    name_similarity:   f64,
    birth_delta:       Option<i32>,
    death_delta:       Option<i32>,
    birth_place_match: bool,
  },
  DuplicateFamily {
    reason:         FamilyDuplicateReason,
    marriage_year:  Option<i32>,
    marriage_place: Option<String>,
  },
  DuplicateMediaLink {
    asset_id:  Uuid,
    person_id: Option<Uuid>,
    family_id: Option<Uuid>,
    count:     usize,
  },
  DuplicateMediaAsset {
    filename_similarity: f64,
    filenames:           Vec<String>,
    #[serde(default)]
    size_bytes:          Vec<Option<i64>>,
    #[serde(default)]
    statuses:            Vec<MediaStatus>,
  },
  NameStandardization {
    given:   Option<FieldSuggestion>,
    surname: Option<FieldSuggestion>,
  },
  PlaceCluster {
    method:               ClusterMethod,
    keys:                 Vec<String>,
    canonical_suggestion: String,
    variants:             Vec<VariantCount>,
  },
  DateNormalization {
    field:      DateField,
    raw:        String,
    normalized: Option<String>,
    precision:  Option<Precision>,
    qualifier:  Option<Qualifier>,
    ambiguous:  bool,
  },
  OrphanEvent {
    reason: String,
  },
  OrphanFamily {
    reason: String,
  },
  ImpossibleTimeline {
    birth_year: i32,
    death_year: i32,
  },
  ParentChildAge {
    parent_birth_year: i32,
    child_birth_year:  i32,
    gap_years:         i32,
  },
  ParentDeathBeforeBirth {
    parent_death_year: i32,
    child_birth_year:  i32,
  },
  MarriageTimeline {
    spouse_id:         Uuid,
    problem:           MarriageProblem,
    marriage_year:     i32,
    spouse_birth_year: Option<i32>,
    spouse_death_year: Option<i32>,
  },
  PlaceholderName {
    given:   Option<String>,
    surname: Option<String>,
  },
}

impl Explanation {
  pub fn issue_type(&self) -> IssueType {
    match self {
      Self::DuplicatePerson { .. } => IssueType::DuplicatePerson,
      Self::DuplicateFamily { .. } => IssueType::DuplicateFamily,
      Self::DuplicateMediaLink { .. } => IssueType::DuplicateMediaLink,
      Self::DuplicateMediaAsset { .. } => IssueType::DuplicateMediaAsset,
      Self::NameStandardization { .. } => IssueType::NameStandardization,
      Self::PlaceCluster { .. } => IssueType::PlaceCluster,
      Self::DateNormalization { .. } => IssueType::DateNormalization,
      Self::OrphanEvent { .. } => IssueType::OrphanEvent,
      Self::OrphanFamily { .. } => IssueType::OrphanFamily,
      Self::ImpossibleTimeline { .. } => IssueType::ImpossibleTimeline,
      Self::ParentChildAge { .. } => IssueType::ParentChildAge,
      Self::ParentDeathBeforeBirth { .. } => IssueType::ParentDeathBeforeBirth,
      Self::MarriageTimeline { .. } => IssueType::MarriageTimeline,
      Self::PlaceholderName { .. } => IssueType::PlaceholderName,
    }
  }

  /// Extra identity beyond the entity ids, for issues that can occur more
  /// than once on the same entities (or reference none).
  pub fn identity_key(&self) -> Option<String> {
    match self {
      Self::PlaceCluster { variants, .. } => {
        let mut values: Vec<&str> =
          variants.iter().map(|v| v.value.as_str()).collect();
        values.sort_unstable();
        Some(values.join("\u{1f}"))
      }
      Self::DateNormalization { field, raw, .. } => Some(format!("{field}:{raw}")),
      Self::DuplicateFamily { reason, .. } => Some(format!("{reason:?}")),
      Self::MarriageTimeline { spouse_id, problem, .. } => {
        Some(format!("{spouse_id}:{problem:?}"))
      }
      _ => None,
    }
  }

  /// Raw place spellings named by a place cluster.
  pub fn place_variants(&self) -> Vec<&str> {
    match self {
      Self::PlaceCluster { variants, .. } => {
        variants.iter().map(|v| v.value.as_str()).collect()
      }
      _ => Vec::new(),
    }
  }
}

// ─── Fingerprint ─────────────────────────────────────────────────────────────

/// Stable identity of an issue: SHA-256 over the type, entity kind, sorted
/// entity ids and the explanation's identity key, as lowercase hex.
pub fn fingerprint(
  issue_type: IssueType,
  entity_type: EntityKind,
  entity_ids: &[Uuid],
  identity_key: Option<&str>,
) -> String {
  let mut ids = entity_ids.to_vec();
  ids.sort_unstable();

  let mut hasher = Sha256::new();
  hasher.update(issue_type.as_ref().as_bytes());
  hasher.update([0]);
  hasher.update(entity_type.as_ref().as_bytes());
  for id in &ids {
    hasher.update([0]);
    hasher.update(id.as_bytes());
  }
  if let Some(key) = identity_key {
    hasher.update([1]);
    hasher.update(key.as_bytes());
  }
  hex::encode(hasher.finalize())
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A detector finding, before it is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIssue {
  pub severity:     Severity,
  pub entity_type:  EntityKind,
  pub entity_ids:   Vec<Uuid>,
  pub confidence:   f64,
  pub impact_score: f64,
  pub explanation:  Explanation,
}

impl NewIssue {
  pub fn issue_type(&self) -> IssueType { self.explanation.issue_type() }

  pub fn fingerprint(&self) -> String {
    fingerprint(
      self.issue_type(),
      self.entity_type,
      &self.entity_ids,
      self.explanation.identity_key().as_deref(),
    )
  }
}

/// A persisted issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
  pub id:           Uuid,
  pub issue_type:   IssueType,
  pub severity:     Severity,
  pub entity_type:  EntityKind,
  pub entity_ids:   Vec<Uuid>,
  pub status:       IssueStatus,
  pub confidence:   f64,
  pub impact_score: f64,
  pub explanation:  Explanation,
  pub fingerprint:  String,
  pub detected_at:  DateTime<Utc>,
  pub resolved_at:  Option<DateTime<Utc>>,
}

impl Issue {
  pub fn is_open(&self) -> bool { self.status == IssueStatus::Open }

  pub fn touches(&self, kind: EntityKind, ids: &[Uuid]) -> bool {
    self.entity_type == kind && self.entity_ids.iter().any(|id| ids.contains(id))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fingerprint_ignores_id_order() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    assert_eq!(
      fingerprint(IssueType::DuplicatePerson, EntityKind::Person, &[a, b], None),
      fingerprint(IssueType::DuplicatePerson, EntityKind::Person, &[b, a], None),
    );
  }

  #[test]
  fn fingerprint_separates_identity_keys() {
    let id = Uuid::new_v4();
    let birth = fingerprint(
      IssueType::DateNormalization,
      EntityKind::Person,
      &[id],
      Some("birth_date:1900"),
    );
    let death = fingerprint(
      IssueType::DateNormalization,
      EntityKind::Person,
      &[id],
      Some("death_date:1900"),
    );
    assert_ne!(birth, death);
    assert_eq!(birth.len(), 64);
  }

  #[test]
  fn explanation_round_trips_through_document() {
    let e = Explanation::ImpossibleTimeline { birth_year: 1900, death_year: 1850 };
    let raw = crate::document::encode(&e).unwrap();
    assert!(raw.contains("\"kind\":\"impossible_timeline\""));
    let back: Explanation = crate::document::decode(&raw).unwrap();
    assert_eq!(back, e);
    assert_eq!(back.issue_type(), IssueType::ImpossibleTimeline);
  }
}
