//! Duplicate people and families.

use std::collections::BTreeMap;

use uuid::Uuid;

use super::{Detector, Findings};
use crate::{
  Result,
  graph::{EntityKind, Family, Graph, Person},
  issue::{Explanation, FamilyDuplicateReason, NewIssue, Severity},
  settings::DetectionSettings,
  similarity::{
    extract_year, normalize_full_name, normalize_name, normalize_place, round2,
    similarity,
  },
};

const BIRTH_YEAR_WEIGHT: f64 = 0.25;
const DEATH_YEAR_WEIGHT: f64 = 0.10;
const BIRTH_PLACE_WEIGHT: f64 = 0.15;
const NAME_WEIGHT: f64 = 0.5;

// ─── People ──────────────────────────────────────────────────────────────────

/// Pairs of people in the same `(surname, birth year)` bucket whose names and
/// vital data agree closely.
pub struct DuplicatePersonDetector {
  settings: DetectionSettings,
}

impl DuplicatePersonDetector {
  pub fn new(settings: DetectionSettings) -> Self { Self { settings } }

  fn score(&self, a: &Person, b: &Person) -> Option<NewIssue> {
    let name_a = normalize_full_name(a.given.as_deref(), a.surname.as_deref());
    let name_b = normalize_full_name(b.given.as_deref(), b.surname.as_deref());
    let name_sim = similarity(&name_a, &name_b);
    if name_sim < self.settings.person_min_name_sim {
      return None;
    }

    let delta = |x: Option<&str>, y: Option<&str>| {
      Some((extract_year(x)? - extract_year(y)?).abs())
    };
    let birth_delta = delta(a.birth_date.as_deref(), b.birth_date.as_deref());
    let death_delta = delta(a.death_date.as_deref(), b.death_date.as_deref());

    let place_a = normalize_place(a.birth_place.as_deref());
    let birth_place_match =
      !place_a.is_empty() && place_a == normalize_place(b.birth_place.as_deref());

    let mut score = NAME_WEIGHT * name_sim;
    if birth_delta.is_some_and(|d| d <= 1) {
      score += BIRTH_YEAR_WEIGHT;
    }
    if death_delta.is_some_and(|d| d <= 1) {
      score += DEATH_YEAR_WEIGHT;
    }
    if birth_place_match {
      score += BIRTH_PLACE_WEIGHT;
    }
    if score < self.settings.person_min_score {
      return None;
    }

    Some(NewIssue {
      severity:     Severity::Warning,
      entity_type:  EntityKind::Person,
      entity_ids:   vec![a.id, b.id],
      confidence:   round2(score.min(1.0)),
      impact_score: 1.0,
      explanation:  Explanation::DuplicatePerson {
        name_similarity: round2(name_sim),
        birth_delta,
        death_delta,
        birth_place_match,
      },
    })
  }
}

impl Detector for DuplicatePersonDetector {
  fn name(&self) -> &'static str { "duplicate_person" }

  fn detect(&self, graph: &Graph) -> Result<Findings> {
    let mut buckets: BTreeMap<(String, Option<i32>), Vec<&Person>> = BTreeMap::new();
    for person in &graph.persons {
      let key = (
        normalize_name(person.surname.as_deref()),
        extract_year(person.birth_date.as_deref()),
      );
      buckets.entry(key).or_default().push(person);
    }

    let mut issues = Vec::new();
    for group in buckets.values_mut().filter(|g| g.len() > 1) {
      group.sort_by_key(|p| p.id);
      for (i, a) in group.iter().enumerate() {
        for b in &group[i + 1..] {
          issues.extend(self.score(a, b));
        }
      }
    }
    Ok(Findings::issues(issues))
  }
}

// ─── Families ────────────────────────────────────────────────────────────────

/// Families sharing a spouse pair and marriage details, and families whose
/// spouses carry identical names but are different person records.
pub struct DuplicateFamilyDetector;

type SpousePair = (Option<Uuid>, Option<Uuid>);

fn spouse_pair(family: &Family) -> SpousePair {
  let (a, b) = (family.husband_id, family.wife_id);
  if a <= b { (a, b) } else { (b, a) }
}

/// Both spouses known, or one spouse plus a marriage date or place. A lone
/// spouse with nothing else says nothing about whether two families match.
fn has_pair_evidence(family: &Family) -> bool {
  match (family.husband_id, family.wife_id) {
    (Some(_), Some(_)) => true,
    (None, None) => false,
    _ => {
      !normalize_place(family.marriage_place.as_deref()).is_empty()
        || extract_year(family.marriage_date.as_deref()).is_some()
    }
  }
}

fn pairwise<'m, 'g: 'm>(
  groups: impl Iterator<Item = &'m mut Vec<&'g Family>>,
  mut emit: impl FnMut(&Family, &Family),
) {
  for group in groups.filter(|g| g.len() > 1) {
    group.sort_by_key(|f| f.id);
    for (i, a) in group.iter().enumerate() {
      for b in &group[i + 1..] {
        emit(*a, *b);
      }
    }
  }
}

impl Detector for DuplicateFamilyDetector {
  fn name(&self) -> &'static str { "duplicate_family" }

  fn detect(&self, graph: &Graph) -> Result<Findings> {
    let people = graph.person_index();
    let mut issues = Vec::new();

    let mut by_spouses: BTreeMap<SpousePair, Vec<&Family>> = BTreeMap::new();
    for family in graph.families.iter().filter(|f| has_pair_evidence(f)) {
      by_spouses.entry(spouse_pair(family)).or_default().push(family);
    }
    pairwise(by_spouses.values_mut(), |a, b| {
      let year_a = extract_year(a.marriage_date.as_deref());
      let place_a = normalize_place(a.marriage_place.as_deref());
      if year_a != extract_year(b.marriage_date.as_deref())
        || place_a != normalize_place(b.marriage_place.as_deref())
      {
        return;
      }
      issues.push(NewIssue {
        severity:     Severity::Warning,
        entity_type:  EntityKind::Family,
        entity_ids:   vec![a.id, b.id],
        confidence:   0.9,
        impact_score: 1.0,
        explanation:  Explanation::DuplicateFamily {
          reason:         FamilyDuplicateReason::SameSpouses,
          marriage_year:  year_a,
          marriage_place: a.marriage_place.clone(),
        },
      });
    });

    let spouse_name = |id: Option<Uuid>| {
      let person = people.get(&id?)?;
      let name =
        normalize_full_name(person.given.as_deref(), person.surname.as_deref());
      (!name.is_empty()).then_some(name)
    };
    let mut by_names: BTreeMap<(String, String), Vec<&Family>> = BTreeMap::new();
    for family in &graph.families {
      let (Some(h), Some(w)) =
        (spouse_name(family.husband_id), spouse_name(family.wife_id))
      else {
        continue;
      };
      let key = if h <= w { (h, w) } else { (w, h) };
      by_names.entry(key).or_default().push(family);
    }
    pairwise(by_names.values_mut(), |a, b| {
      if spouse_pair(a) == spouse_pair(b) {
        return;
      }
      issues.push(NewIssue {
        severity:     Severity::Warning,
        entity_type:  EntityKind::Family,
        entity_ids:   vec![a.id, b.id],
        confidence:   0.7,
        impact_score: 1.0,
        explanation:  Explanation::DuplicateFamily {
          reason:         FamilyDuplicateReason::SpouseSwap,
          marriage_year:  extract_year(a.marriage_date.as_deref()),
          marriage_place: a.marriage_place.clone(),
        },
      });
    });

    Ok(Findings::issues(issues))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn person(given: &str, surname: &str, birth: Option<&str>) -> Person {
    Person {
      given: Some(given.into()),
      surname: Some(surname.into()),
      birth_date: birth.map(Into::into),
      ..Person::new()
    }
  }

  fn detect_people(persons: Vec<Person>) -> Vec<NewIssue> {
    let graph = Graph { persons, ..Default::default() };
    DuplicatePersonDetector::new(DetectionSettings::default())
      .detect(&graph)
      .unwrap()
      .issues
  }

  #[test]
  fn near_names_with_same_birth_year_are_flagged() {
    let issues = detect_people(vec![
      person("John", "Sample", Some("1980")),
      person("Jon", "Sample", Some("1980")),
    ]);
    assert_eq!(issues.len(), 1);
    assert!(issues[0].confidence >= 0.55);
    assert!(matches!(
      issues[0].explanation,
      Explanation::DuplicatePerson { birth_delta: Some(0), .. }
    ));
  }

  #[test]
  fn different_birth_years_fall_in_different_buckets() {
    let issues = detect_people(vec![
      person("John", "Sample", Some("1980")),
      person("John", "Sample", Some("1981")),
    ]);
    assert!(issues.is_empty());
  }

  #[test]
  fn dissimilar_names_are_ignored() {
    let issues = detect_people(vec![
      person("John", "Sample", Some("1980")),
      person("Mary", "Sample", Some("1980")),
    ]);
    assert!(issues.is_empty());
  }

  #[test]
  fn name_alone_is_not_enough() {
    // 0.5 * 1.0 without any corroborating vital data stays below 0.55.
    let issues = detect_people(vec![
      person("John", "Sample", None),
      person("John", "Sample", None),
    ]);
    assert!(issues.is_empty());
  }

  #[test]
  fn same_spouses_and_marriage_is_duplicate_family() {
    let h = Uuid::new_v4();
    let w = Uuid::new_v4();
    let a = Family {
      husband_id: Some(h),
      wife_id: Some(w),
      marriage_date: Some("1900".into()),
      ..Family::new()
    };
    let b = Family {
      husband_id: Some(w),
      wife_id: Some(h),
      marriage_date: Some("ABT 1900".into()),
      ..Family::new()
    };
    let graph = Graph { families: vec![a, b], ..Default::default() };
    let issues = DuplicateFamilyDetector.detect(&graph).unwrap().issues;
    assert_eq!(issues.len(), 1);
  }

  #[test]
  fn lone_spouse_families_need_marriage_details() {
    let h = Uuid::new_v4();
    let bare = || Family { husband_id: Some(h), ..Family::new() };
    let graph = Graph { families: vec![bare(), bare()], ..Default::default() };
    assert!(DuplicateFamilyDetector.detect(&graph).unwrap().issues.is_empty());

    let married = || Family {
      husband_id: Some(h),
      marriage_date: Some("1871".into()),
      ..Family::new()
    };
    let graph = Graph { families: vec![married(), married()], ..Default::default() };
    assert_eq!(DuplicateFamilyDetector.detect(&graph).unwrap().issues.len(), 1);
  }

  #[test]
  fn spouse_swap_is_detected_by_names() {
    let h1 = person("John", "Smith", None);
    let w1 = person("Mary", "Jones", None);
    let h2 = person("John", "Smith", None);
    let w2 = person("Mary", "Jones", None);
    let a = Family { husband_id: Some(h1.id), wife_id: Some(w1.id), ..Family::new() };
    let b = Family { husband_id: Some(w2.id), wife_id: Some(h2.id), ..Family::new() };
    let graph = Graph {
      persons: vec![h1, w1, h2, w2],
      families: vec![a, b],
      ..Default::default()
    };
    let issues = DuplicateFamilyDetector.detect(&graph).unwrap().issues;
    assert_eq!(issues.len(), 1);
    assert!(matches!(
      issues[0].explanation,
      Explanation::DuplicateFamily { reason: FamilyDuplicateReason::SpouseSwap, .. }
    ));
  }
}
