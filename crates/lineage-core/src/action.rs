//! Remediation requests and the action log.
//!
//! Every applied [`ActionRequest`] produces exactly one [`ActionLog`] entry
//! whose [`UndoRecord`] holds a complete snapshot of everything the action
//! altered. Merged-away rows are stored in full so undo can recreate them
//! with their original ids.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  date::{DateField, DateNormalization, Precision, Qualifier},
  graph::{
    EntityKind, Family, FamilyChild, MediaAsset, MediaLink, Person, PersonField,
    PlaceVariant, Relationship,
  },
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionType {
  MergePeople,
  MergeFamilies,
  MergeMediaAssets,
  DedupeMediaLinks,
  NormalizePlaces,
  NormalizeDates,
  StandardizeFields,
}

// ─── Requests ────────────────────────────────────────────────────────────────

/// One confirmed date parse to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateNormalizationItem {
  pub entity_type: EntityKind,
  pub entity_id:   Uuid,
  /// Which column the raw value came from. When omitted for a person, every
  /// date column holding exactly `raw` is updated.
  #[serde(default)]
  pub field:       Option<DateField>,
  pub raw:         String,
  #[serde(default)]
  pub normalized:  Option<String>,
  #[serde(default)]
  pub precision:   Option<Precision>,
  #[serde(default)]
  pub qualifier:   Option<Qualifier>,
  #[serde(default)]
  pub confidence:  f64,
  #[serde(default)]
  pub ambiguous:   bool,
}

impl DateNormalizationItem {
  pub fn to_row(&self) -> DateNormalization {
    DateNormalization {
      entity_type:  self.entity_type,
      entity_id:    self.entity_id,
      raw_value:    self.raw.clone(),
      normalized:   self.normalized.clone(),
      precision:    self.precision,
      qualifier:    self.qualifier,
      confidence:   self.confidence,
      is_ambiguous: self.ambiguous,
    }
  }

  /// Whether the raw scalar column may be overwritten with `normalized`.
  pub fn rewrites_raw(&self) -> bool { !self.ambiguous && self.normalized.is_some() }
}

/// New name values for one person. Absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameItem {
  pub person_id: Uuid,
  #[serde(default)]
  pub given:     Option<String>,
  #[serde(default)]
  pub surname:   Option<String>,
}

/// An operator's request to change the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum ActionRequest {
  MergePeople {
    from_id:     Uuid,
    into_id:     Uuid,
    #[serde(default)]
    fill_missing: bool,
  },
  MergeFamilies {
    from_id:     Uuid,
    into_id:     Uuid,
    #[serde(default)]
    fill_missing: bool,
  },
  MergeMediaAssets {
    from_id: Uuid,
    into_id: Uuid,
  },
  DedupeMediaLinks {
    link_ids: Vec<Uuid>,
    keep_id:  Uuid,
  },
  NormalizePlaces {
    canonical: String,
    variants:  Vec<String>,
  },
  NormalizeDates {
    items: Vec<DateNormalizationItem>,
  },
  StandardizeFields {
    items: Vec<NameItem>,
  },
}

impl ActionRequest {
  pub fn action_type(&self) -> ActionType {
    match self {
      Self::MergePeople { .. } => ActionType::MergePeople,
      Self::MergeFamilies { .. } => ActionType::MergeFamilies,
      Self::MergeMediaAssets { .. } => ActionType::MergeMediaAssets,
      Self::DedupeMediaLinks { .. } => ActionType::DedupeMediaLinks,
      Self::NormalizePlaces { .. } => ActionType::NormalizePlaces,
      Self::NormalizeDates { .. } => ActionType::NormalizeDates,
      Self::StandardizeFields { .. } => ActionType::StandardizeFields,
    }
  }

  /// Checks that need no storage access. Existence checks happen in the
  /// backend, inside the transaction.
  pub fn validate(&self) -> Result<()> {
    match self {
      Self::MergePeople { from_id, into_id, .. }
      | Self::MergeFamilies { from_id, into_id, .. }
      | Self::MergeMediaAssets { from_id, into_id } => {
        if from_id == into_id {
          return Err(Error::invalid("cannot merge an entity into itself"));
        }
      }
      Self::DedupeMediaLinks { link_ids, keep_id } => {
        if link_ids.len() < 2 {
          return Err(Error::invalid("dedupe needs at least two links"));
        }
        if !link_ids.contains(keep_id) {
          return Err(Error::invalid("keep_id must be one of link_ids"));
        }
      }
      Self::NormalizePlaces { canonical, variants } => {
        if canonical.trim().is_empty() {
          return Err(Error::invalid("canonical place name is empty"));
        }
        if variants.iter().all(|v| v.trim().is_empty()) {
          return Err(Error::invalid("no place variants given"));
        }
      }
      Self::NormalizeDates { items } => {
        if items.is_empty() {
          return Err(Error::invalid("no date items given"));
        }
        for item in items {
          if !matches!(
            item.entity_type,
            EntityKind::Person | EntityKind::Event | EntityKind::Family
          ) {
            return Err(Error::invalid(format!(
              "dates cannot be normalized on {}",
              item.entity_type
            )));
          }
          if item.raw.trim().is_empty() {
            return Err(Error::invalid("date item has an empty raw value"));
          }
          if let Some(field) =
            item.field.filter(|f| !f.belongs_to(item.entity_type))
          {
            return Err(Error::invalid(format!(
              "{field} is not a date column of {}",
              item.entity_type
            )));
          }
        }
      }
      Self::StandardizeFields { items } => {
        if items.is_empty() {
          return Err(Error::invalid("no name items given"));
        }
        for item in items {
          let values = [item.given.as_deref(), item.surname.as_deref()];
          if values.iter().all(Option::is_none) {
            return Err(Error::invalid(format!(
              "name item for {} sets no field",
              item.person_id
            )));
          }
          if values.iter().flatten().any(|v| v.trim().is_empty()) {
            return Err(Error::invalid("names cannot be set to blank"));
          }
        }
      }
    }
    Ok(())
  }
}

// ─── Undo payloads ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonMergeUndo {
  pub from:                    Person,
  pub into_before:             Person,
  #[serde(default)]
  pub moved_events:            Vec<Uuid>,
  #[serde(default)]
  pub moved_notes:             Vec<Uuid>,
  #[serde(default)]
  pub moved_links:             Vec<Uuid>,
  /// Links of `from` that duplicated one of `into`'s and were deleted.
  #[serde(default)]
  pub dropped_links:           Vec<MediaLink>,
  #[serde(default)]
  pub husband_of:              Vec<Uuid>,
  #[serde(default)]
  pub wife_of:                 Vec<Uuid>,
  /// Every edge that touched `from`, as it was.
  #[serde(default)]
  pub relationships_removed:   Vec<Relationship>,
  #[serde(default)]
  pub relationships_added:     Vec<Relationship>,
  #[serde(default)]
  pub family_children_removed: Vec<FamilyChild>,
  #[serde(default)]
  pub family_children_added:   Vec<FamilyChild>,
  #[serde(default)]
  pub date_normalizations:     Vec<DateNormalization>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyMergeUndo {
  pub from:                    Family,
  pub into_before:             Family,
  #[serde(default)]
  pub moved_events:            Vec<Uuid>,
  #[serde(default)]
  pub moved_notes:             Vec<Uuid>,
  #[serde(default)]
  pub moved_links:             Vec<Uuid>,
  #[serde(default)]
  pub dropped_links:           Vec<MediaLink>,
  #[serde(default)]
  pub family_children_removed: Vec<FamilyChild>,
  #[serde(default)]
  pub family_children_added:   Vec<FamilyChild>,
  /// Parent edges created between `into`'s spouses and the moved children.
  #[serde(default)]
  pub relationships_added:     Vec<Relationship>,
  #[serde(default)]
  pub date_normalizations:     Vec<DateNormalization>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMergeUndo {
  pub from:          MediaAsset,
  #[serde(default)]
  pub moved_links:   Vec<Uuid>,
  #[serde(default)]
  pub dropped_links: Vec<MediaLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDedupeUndo {
  pub deleted: Vec<MediaLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPlaceBefore {
  pub id:        Uuid,
  pub place_raw: Option<String>,
  pub place_id:  Option<Uuid>,
}

/// Previous value of one nullable text column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonValueBefore {
  pub id:    Uuid,
  pub field: PersonField,
  pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyValueBefore {
  pub id:    Uuid,
  pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceNormalizationUndo {
  pub place_id:         Uuid,
  /// The canonical place did not exist before and is deleted on undo.
  pub place_created:    bool,
  #[serde(default)]
  pub variants_created: Vec<Uuid>,
  /// Variants that already existed and were pointed at `place_id`.
  #[serde(default)]
  pub variants_before:  Vec<PlaceVariant>,
  #[serde(default)]
  pub events:           Vec<EventPlaceBefore>,
  #[serde(default)]
  pub persons:          Vec<PersonValueBefore>,
  /// Previous `marriage_place` values.
  #[serde(default)]
  pub families:         Vec<FamilyValueBefore>,
}

/// The normalization row for one `(entity, raw)` key before the action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationRowBefore {
  pub entity_type: EntityKind,
  pub entity_id:   Uuid,
  pub raw_value:   String,
  pub previous:    Option<DateNormalization>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDateBefore {
  pub id:             Uuid,
  pub date_canonical: Option<NaiveDate>,
}

/// Previous value of one raw date column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDateBefore {
  pub entity_type: EntityKind,
  pub entity_id:   Uuid,
  pub field:       DateField,
  pub value:       Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateNormalizationUndo {
  #[serde(default)]
  pub rows:      Vec<NormalizationRowBefore>,
  #[serde(default)]
  pub events:    Vec<EventDateBefore>,
  #[serde(default)]
  pub raw_dates: Vec<RawDateBefore>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameBefore {
  pub person_id: Uuid,
  pub given:     Option<String>,
  pub surname:   Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStandardizationUndo {
  pub names: Vec<NameBefore>,
}

/// Everything needed to reverse one action, by action type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UndoPayload {
  MergePeople(PersonMergeUndo),
  MergeFamilies(FamilyMergeUndo),
  MergeMediaAssets(AssetMergeUndo),
  DedupeMediaLinks(LinkDedupeUndo),
  NormalizePlaces(PlaceNormalizationUndo),
  NormalizeDates(DateNormalizationUndo),
  StandardizeFields(FieldStandardizationUndo),
}

impl UndoPayload {
  pub fn action_type(&self) -> ActionType {
    match self {
      Self::MergePeople(_) => ActionType::MergePeople,
      Self::MergeFamilies(_) => ActionType::MergeFamilies,
      Self::MergeMediaAssets(_) => ActionType::MergeMediaAssets,
      Self::DedupeMediaLinks(_) => ActionType::DedupeMediaLinks,
      Self::NormalizePlaces(_) => ActionType::NormalizePlaces,
      Self::NormalizeDates(_) => ActionType::NormalizeDates,
      Self::StandardizeFields(_) => ActionType::StandardizeFields,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoRecord {
  /// Issues the action resolved; reopened by undo.
  #[serde(default)]
  pub resolved_issues: Vec<Uuid>,
  pub payload:         UndoPayload,
}

/// A persisted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLog {
  pub id:          Uuid,
  pub action_type: ActionType,
  pub payload:     ActionRequest,
  pub undo:        UndoRecord,
  pub created_at:  DateTime<Utc>,
  pub applied_by:  Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn request_json_shape() {
    let raw = r#"{"type":"merge_people","params":{"from_id":"6f1c1f4e-6a4f-4f55-9d36-0a0b1b2c3d4e","into_id":"0a0b1b2c-3d4e-4f55-9d36-6f1c1f4e6a4f"}}"#;
    let request: ActionRequest = serde_json::from_str(raw).unwrap();
    assert_eq!(request.action_type(), ActionType::MergePeople);
    assert!(matches!(request, ActionRequest::MergePeople { fill_missing: false, .. }));
  }

  #[test]
  fn self_merge_is_rejected() {
    let id = Uuid::new_v4();
    let err = ActionRequest::MergeFamilies { from_id: id, into_id: id, fill_missing: true }
      .validate()
      .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
  }

  #[test]
  fn date_items_must_target_date_columns() {
    let item = DateNormalizationItem {
      entity_type: EntityKind::MediaAsset,
      entity_id:   Uuid::new_v4(),
      field:       None,
      raw:         "1900".into(),
      normalized:  Some("1900".into()),
      precision:   Some(Precision::Year),
      qualifier:   None,
      confidence:  0.7,
      ambiguous:   false,
    };
    let request = ActionRequest::NormalizeDates { items: vec![item.clone()] };
    assert!(request.validate().is_err());

    let wrong_field = DateNormalizationItem {
      entity_type: EntityKind::Event,
      field: Some(DateField::BirthDate),
      ..item
    };
    let request = ActionRequest::NormalizeDates { items: vec![wrong_field] };
    assert!(request.validate().is_err());
  }

  #[test]
  fn dedupe_requires_keep_among_links() {
    let request = ActionRequest::DedupeMediaLinks {
      link_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
      keep_id:  Uuid::new_v4(),
    };
    assert!(request.validate().is_err());
  }

  #[test]
  fn blank_names_are_rejected() {
    let request = ActionRequest::StandardizeFields {
      items: vec![NameItem {
        person_id: Uuid::new_v4(),
        given:     Some("  ".into()),
        surname:   None,
      }],
    };
    assert!(request.validate().is_err());
  }
}
