//! Integration tests for `SqliteStore` against an in-memory database.

mod detect;
mod normalize;

use lineage_core::{
  graph::Person,
  issue::{Issue, IssueStatus, IssueType},
  store::{IssueQuery, QualityStore},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn person(given: &str, surname: &str, birth: Option<&str>) -> Person {
  Person {
    given: Some(given.into()),
    surname: Some(surname.into()),
    birth_date: birth.map(Into::into),
    ..Person::new()
  }
}

async fn add(s: &SqliteStore, p: &Person) -> Person {
  s.add_person(p).await.unwrap();
  p.clone()
}

/// Issues of one type, any status.
async fn issues_of(s: &SqliteStore, issue_type: IssueType) -> Vec<Issue> {
  let query = IssueQuery { issue_type: Some(issue_type), per_page: 500, ..Default::default() };
  s.list_issues(&query).await.unwrap().items
}

async fn open_issues_of(s: &SqliteStore, issue_type: IssueType) -> Vec<Issue> {
  let query = IssueQuery {
    issue_type: Some(issue_type),
    status: Some(IssueStatus::Open),
    per_page: 500,
    ..Default::default()
  };
  s.list_issues(&query).await.unwrap().items
}
