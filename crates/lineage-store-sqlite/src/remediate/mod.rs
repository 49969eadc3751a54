//! Remediation: apply one [`ActionRequest`] and log how to reverse it.
//!
//! Each operation validates, snapshots what it is about to change, mutates
//! and resolves the issues it made obsolete, all inside the caller's
//! transaction. The returned [`Applied`] becomes the action's undo record.

mod merge;
mod normalize;

use chrono::{DateTime, Utc};
use lineage_core::action::{ActionLog, ActionRequest, UndoPayload, UndoRecord};
use rusqlite::Connection;
use uuid::Uuid;

use crate::{Result, actions};

/// What a remediation did.
pub struct Applied {
  pub payload:  UndoPayload,
  pub resolved: Vec<Uuid>,
}

pub fn apply(
  conn: &mut Connection,
  request: ActionRequest,
  applied_by: Option<String>,
) -> Result<ActionLog> {
  request.validate()?;

  let tx = conn.transaction()?;
  let now = Utc::now();
  let applied = dispatch(&tx, &request, now)?;

  let action = ActionLog {
    id: Uuid::new_v4(),
    action_type: request.action_type(),
    payload: request,
    undo: UndoRecord { resolved_issues: applied.resolved, payload: applied.payload },
    created_at: now,
    applied_by,
  };
  actions::insert(&tx, &action)?;
  tx.commit()?;

  tracing::info!(
    action_id = %action.id,
    action_type = %action.action_type,
    resolved = action.undo.resolved_issues.len(),
    "action applied"
  );
  Ok(action)
}

fn dispatch(conn: &Connection, request: &ActionRequest, now: DateTime<Utc>) -> Result<Applied> {
  match request {
    ActionRequest::MergePeople { from_id, into_id, fill_missing } => {
      merge::people(conn, *from_id, *into_id, *fill_missing, now)
    }
    ActionRequest::MergeFamilies { from_id, into_id, fill_missing } => {
      merge::families(conn, *from_id, *into_id, *fill_missing, now)
    }
    ActionRequest::MergeMediaAssets { from_id, into_id } => {
      merge::assets(conn, *from_id, *into_id, now)
    }
    ActionRequest::DedupeMediaLinks { link_ids, keep_id } => {
      merge::dedupe_links(conn, link_ids, *keep_id, now)
    }
    ActionRequest::NormalizePlaces { canonical, variants } => {
      normalize::places(conn, canonical, variants, now)
    }
    ActionRequest::NormalizeDates { items } => normalize::dates(conn, items, now),
    ActionRequest::StandardizeFields { items } => normalize::names(conn, items, now),
  }
}

/// Treat whitespace-only text as absent.
pub(crate) fn is_blank(value: Option<&str>) -> bool {
  value.is_none_or(|v| v.trim().is_empty())
}
