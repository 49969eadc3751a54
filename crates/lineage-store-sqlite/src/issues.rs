//! Issue persistence: insert, query, resolve, reopen, summarise.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use lineage_core::{
  document,
  issue::{Issue, IssueStatus, IssueType, NewIssue},
  store::{IssuePage, IssueQuery, Summary},
};
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{ISSUE_COLUMNS, collect, decode_enum, encode_dt, encode_ids, encode_uuid, read_issue},
};

pub fn insert(conn: &Connection, issue: &NewIssue, now: DateTime<Utc>) -> Result<Uuid> {
  let id = Uuid::new_v4();
  let mut ids = issue.entity_ids.clone();
  ids.sort_unstable();
  conn.execute(
    &format!(
      "INSERT INTO dq_issues ({ISSUE_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, NULL)"
    ),
    params![
      encode_uuid(id),
      issue.issue_type().as_ref(),
      issue.severity.as_ref(),
      issue.entity_type.as_ref(),
      encode_ids(&ids)?,
      IssueStatus::Open.as_ref(),
      issue.confidence,
      issue.impact_score,
      document::encode(&issue.explanation)?,
      issue.fingerprint(),
      encode_dt(now),
    ],
  )?;
  Ok(id)
}

pub fn open_fingerprints(conn: &Connection) -> Result<HashSet<String>> {
  let mut stmt = conn.prepare("SELECT fingerprint FROM dq_issues WHERE status = 'open'")?;
  let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
  Ok(rows.collect::<rusqlite::Result<_>>()?)
}

pub fn delete_open(conn: &Connection) -> Result<usize> {
  Ok(conn.execute("DELETE FROM dq_issues WHERE status = 'open'", [])?)
}

pub fn get(conn: &Connection, id: Uuid) -> Result<Option<Issue>> {
  let mut stmt =
    conn.prepare(&format!("SELECT {ISSUE_COLUMNS} FROM dq_issues WHERE issue_id = ?1"))?;
  Ok(collect(stmt.query(params![encode_uuid(id)])?, read_issue)?.into_iter().next())
}

pub fn list(conn: &Connection, query: &IssueQuery) -> Result<IssuePage> {
  let issue_type = query.issue_type.map(|t| t.as_ref().to_owned());
  let status = query.status.map(|s| s.as_ref().to_owned());
  let filter = "(?1 IS NULL OR issue_type = ?1) AND (?2 IS NULL OR status = ?2)";

  let total: i64 = conn.query_row(
    &format!("SELECT COUNT(*) FROM dq_issues WHERE {filter}"),
    params![issue_type, status],
    |row| row.get(0),
  )?;

  let (limit, offset) = query.window();
  let offset = i64::try_from(offset).unwrap_or(i64::MAX);
  let mut stmt = conn.prepare(&format!(
    "SELECT {ISSUE_COLUMNS} FROM dq_issues WHERE {filter}
     ORDER BY detected_at DESC, confidence DESC, issue_id
     LIMIT ?3 OFFSET ?4"
  ))?;
  let rows = stmt.query(params![issue_type, status, limit as i64, offset])?;
  Ok(IssuePage { items: collect(rows, read_issue)?, total: total as usize })
}

/// Mark every open issue matching `pred` resolved and return their ids.
pub fn resolve_where(
  conn: &Connection,
  now: DateTime<Utc>,
  pred: impl Fn(&Issue) -> bool,
) -> Result<Vec<Uuid>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {ISSUE_COLUMNS} FROM dq_issues WHERE status = 'open' ORDER BY issue_id"
  ))?;
  let open = collect(stmt.query([])?, read_issue)?;

  let mut resolved = Vec::new();
  let mut update = conn.prepare(
    "UPDATE dq_issues SET status = 'resolved', resolved_at = ?2 WHERE issue_id = ?1",
  )?;
  for issue in open.iter().filter(|&i| pred(i)) {
    update.execute(params![encode_uuid(issue.id), encode_dt(now)])?;
    resolved.push(issue.id);
  }
  Ok(resolved)
}

/// Reopen resolved issues, skipping any whose fingerprint has since been
/// re-detected as a new open issue.
pub fn reopen(conn: &Connection, ids: &[Uuid]) -> Result<usize> {
  let mut stmt = conn.prepare(
    "UPDATE dq_issues SET status = 'open', resolved_at = NULL
     WHERE issue_id = ?1 AND status = 'resolved'
       AND NOT EXISTS (
         SELECT 1 FROM dq_issues o
         WHERE o.fingerprint = dq_issues.fingerprint AND o.status = 'open'
       )",
  )?;
  let mut reopened = 0;
  for id in ids {
    reopened += stmt.execute(params![encode_uuid(*id)])?;
  }
  Ok(reopened)
}

pub fn summary(conn: &Connection) -> Result<Summary> {
  let (total_dates, normalized_dates): (i64, i64) = conn.query_row(
    "SELECT COUNT(*), COUNT(normalized) FROM date_normalizations",
    [],
    |row| Ok((row.get(0)?, row.get(1)?)),
  )?;

  let mut stmt = conn.prepare(
    "SELECT issue_type, COUNT(*) FROM dq_issues WHERE status = 'open' GROUP BY issue_type",
  )?;
  let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
  let mut open: BTreeMap<IssueType, usize> = BTreeMap::new();
  for row in rows {
    let (issue_type, count) = row?;
    open.insert(decode_enum("issue type", &issue_type)?, count as usize);
  }
  let count_where = |pred: fn(IssueType) -> bool| -> usize {
    open.iter().filter(|(t, _)| pred(**t)).map(|(_, n)| n).sum()
  };

  Ok(Summary::compute(
    total_dates as usize,
    normalized_dates as usize,
    count_where(IssueType::is_duplicate),
    count_where(|t| t == IssueType::PlaceCluster),
    count_where(IssueType::is_integrity),
    count_where(|t| t == IssueType::NameStandardization),
  ))
}
