//! Referential and timeline checks.
//!
//! All timeline rules compare years only, taken from the raw date text with
//! [`extract_year`]. A person without a readable year is never flagged.

use std::collections::HashSet;

use uuid::Uuid;

use super::{Detector, Findings};
use crate::{
  Result,
  graph::{EntityKind, Graph, Person},
  issue::{Explanation, MarriageProblem, NewIssue, Severity},
  settings::DetectionSettings,
  similarity::{extract_year, normalize_name},
};

pub struct IntegrityDetector {
  settings: DetectionSettings,
}

fn birth_year(p: &Person) -> Option<i32> { extract_year(p.birth_date.as_deref()) }

fn death_year(p: &Person) -> Option<i32> { extract_year(p.death_date.as_deref()) }

impl IntegrityDetector {
  pub fn new(settings: DetectionSettings) -> Self { Self { settings } }

  fn orphans(&self, graph: &Graph, issues: &mut Vec<NewIssue>) {
    let persons: HashSet<Uuid> = graph.persons.iter().map(|p| p.id).collect();
    let families: HashSet<Uuid> = graph.families.iter().map(|f| f.id).collect();

    for event in &graph.events {
      let reason = match (event.person_id, event.family_id) {
        (None, None) => "event has no person or family",
        (Some(_), Some(_)) => "event references both a person and a family",
        (Some(p), None) if !persons.contains(&p) => "event references a missing person",
        (None, Some(f)) if !families.contains(&f) => "event references a missing family",
        _ => continue,
      };
      issues.push(NewIssue {
        severity:     Severity::Error,
        entity_type:  EntityKind::Event,
        entity_ids:   vec![event.id],
        confidence:   0.9,
        impact_score: 0.5,
        explanation:  Explanation::OrphanEvent { reason: reason.to_owned() },
      });
    }

    let children = graph.children_by_family();
    for family in &graph.families {
      if family.spouses().next().is_some() || children.contains_key(&family.id) {
        continue;
      }
      issues.push(NewIssue {
        severity:     Severity::Warning,
        entity_type:  EntityKind::Family,
        entity_ids:   vec![family.id],
        confidence:   0.8,
        impact_score: 0.5,
        explanation:  Explanation::OrphanFamily {
          reason: "family has no spouses and no children".to_owned(),
        },
      });
    }
  }

  fn timelines(&self, graph: &Graph, issues: &mut Vec<NewIssue>) {
    for person in &graph.persons {
      let (Some(birth), Some(death)) = (birth_year(person), death_year(person)) else {
        continue;
      };
      if death < birth {
        issues.push(NewIssue {
          severity:     Severity::Error,
          entity_type:  EntityKind::Person,
          entity_ids:   vec![person.id],
          confidence:   0.95,
          impact_score: 1.0,
          explanation:  Explanation::ImpossibleTimeline {
            birth_year: birth,
            death_year: death,
          },
        });
      }
    }
  }

  fn parentage(&self, graph: &Graph, issues: &mut Vec<NewIssue>) {
    let people = graph.person_index();
    for rel in &graph.relationships {
      let (Some(parent), Some(child)) = (people.get(&rel.parent_id), people.get(&rel.child_id))
      else {
        continue;
      };
      let Some(child_birth) = birth_year(child) else {
        continue;
      };

      if let Some(parent_birth) = birth_year(parent) {
        let gap = child_birth - parent_birth;
        if gap < self.settings.min_parent_age {
          issues.push(NewIssue {
            severity:     Severity::Warning,
            entity_type:  EntityKind::Person,
            entity_ids:   vec![parent.id, child.id],
            confidence:   0.85,
            impact_score: 0.8,
            explanation:  Explanation::ParentChildAge {
              parent_birth_year: parent_birth,
              child_birth_year:  child_birth,
              gap_years:         gap,
            },
          });
        }
      }

      if let Some(parent_death) = death_year(parent).filter(|d| *d < child_birth) {
        issues.push(NewIssue {
          severity:     Severity::Warning,
          entity_type:  EntityKind::Person,
          entity_ids:   vec![parent.id, child.id],
          confidence:   0.75,
          impact_score: 0.8,
          explanation:  Explanation::ParentDeathBeforeBirth {
            parent_death_year: parent_death,
            child_birth_year:  child_birth,
          },
        });
      }
    }
  }

  fn marriages(&self, graph: &Graph, issues: &mut Vec<NewIssue>) {
    let people = graph.person_index();
    for family in &graph.families {
      let Some(marriage_year) = extract_year(family.marriage_date.as_deref()) else {
        continue;
      };
      for spouse in family.spouses().filter_map(|id| people.get(&id)) {
        let born = birth_year(spouse);
        let died = death_year(spouse);
        let problems = [
          born
            .is_some_and(|b| marriage_year - b < self.settings.min_marriage_age)
            .then_some(MarriageProblem::BeforeSpouseAdult),
          died
            .is_some_and(|d| marriage_year > d)
            .then_some(MarriageProblem::AfterSpouseDeath),
        ];
        for problem in problems.into_iter().flatten() {
          issues.push(NewIssue {
            severity:     Severity::Warning,
            entity_type:  EntityKind::Family,
            entity_ids:   vec![family.id],
            confidence:   0.8,
            impact_score: 0.8,
            explanation:  Explanation::MarriageTimeline {
              spouse_id: spouse.id,
              problem,
              marriage_year,
              spouse_birth_year: born,
              spouse_death_year: died,
            },
          });
        }
      }
    }
  }

  fn placeholders(&self, graph: &Graph, issues: &mut Vec<NewIssue>) {
    for person in &graph.persons {
      let is_placeholder =
        |v: Option<&str>| v.is_some_and(|v| self.settings.is_placeholder(&normalize_name(Some(v))));
      if !is_placeholder(person.given.as_deref()) && !is_placeholder(person.surname.as_deref()) {
        continue;
      }
      issues.push(NewIssue {
        severity:     Severity::Warning,
        entity_type:  EntityKind::Person,
        entity_ids:   vec![person.id],
        confidence:   0.8,
        impact_score: 0.2,
        explanation:  Explanation::PlaceholderName {
          given:   person.given.clone(),
          surname: person.surname.clone(),
        },
      });
    }
  }
}

impl Detector for IntegrityDetector {
  fn name(&self) -> &'static str { "integrity" }

  fn detect(&self, graph: &Graph) -> Result<Findings> {
    let mut issues = Vec::new();
    self.orphans(graph, &mut issues);
    self.timelines(graph, &mut issues);
    self.parentage(graph, &mut issues);
    self.marriages(graph, &mut issues);
    self.placeholders(graph, &mut issues);
    Ok(Findings::issues(issues))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    graph::{Event, EventType, Family, FamilyChild, Relationship},
    issue::IssueType,
  };

  fn born(year: &str, died: Option<&str>) -> Person {
    Person {
      given: Some("Ann".into()),
      surname: Some("Lee".into()),
      birth_date: Some(year.into()),
      death_date: died.map(Into::into),
      ..Person::new()
    }
  }

  fn types(graph: &Graph) -> Vec<IssueType> {
    IntegrityDetector::new(DetectionSettings::default())
      .detect(graph)
      .unwrap()
      .issues
      .iter()
      .map(NewIssue::issue_type)
      .collect()
  }

  #[test]
  fn death_before_birth() {
    let graph = Graph { persons: vec![born("1900", Some("1850"))], ..Default::default() };
    assert_eq!(types(&graph), vec![IssueType::ImpossibleTimeline]);
  }

  #[test]
  fn young_parent_and_dead_parent() {
    let parent = born("1900", Some("1905"));
    let child = born("1908", None);
    let graph = Graph {
      relationships: vec![Relationship::parent(parent.id, child.id)],
      persons: vec![parent, child],
      ..Default::default()
    };
    assert_eq!(
      types(&graph),
      vec![IssueType::ParentChildAge, IssueType::ParentDeathBeforeBirth]
    );
  }

  #[test]
  fn orphan_event_and_family() {
    let kept = born("1900", None);
    let with_child = Family::new();
    let graph = Graph {
      events: vec![
        Event::new(EventType::Census),
        Event { person_id: Some(kept.id), ..Event::new(EventType::Birth) },
      ],
      family_children: vec![FamilyChild { family_id: with_child.id, child_id: kept.id }],
      families: vec![Family::new(), with_child],
      persons: vec![kept],
      ..Default::default()
    };
    assert_eq!(types(&graph), vec![IssueType::OrphanEvent, IssueType::OrphanFamily]);
  }

  #[test]
  fn marriage_outside_spouse_lifetime() {
    let child_bride = born("1895", None);
    let dead_groom = born("1850", Some("1890"));
    let family = Family {
      husband_id: Some(dead_groom.id),
      wife_id: Some(child_bride.id),
      marriage_date: Some("ABT 1900".into()),
      ..Family::new()
    };
    let graph = Graph {
      persons: vec![child_bride, dead_groom],
      families: vec![family],
      ..Default::default()
    };
    assert_eq!(types(&graph), vec![IssueType::MarriageTimeline; 2]);
  }

  #[test]
  fn placeholder_names() {
    let mut p = born("1900", None);
    p.surname = Some("Unknown".into());
    let graph = Graph { persons: vec![p], ..Default::default() };
    assert_eq!(types(&graph), vec![IssueType::PlaceholderName]);
  }
}
