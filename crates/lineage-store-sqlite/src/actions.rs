//! The action log table.

use lineage_core::{action::ActionLog, document};
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{ACTION_COLUMNS, collect, encode_dt, encode_uuid, read_action},
};

pub fn insert(conn: &Connection, action: &ActionLog) -> Result<()> {
  conn.execute(
    &format!("INSERT INTO dq_action_log ({ACTION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
    params![
      encode_uuid(action.id),
      action.action_type.as_ref(),
      document::encode(&action.payload)?,
      document::encode(&action.undo)?,
      encode_dt(action.created_at),
      action.applied_by,
    ],
  )?;
  Ok(())
}

pub fn get(conn: &Connection, id: Uuid) -> Result<Option<ActionLog>> {
  let mut stmt = conn
    .prepare(&format!("SELECT {ACTION_COLUMNS} FROM dq_action_log WHERE action_id = ?1"))?;
  Ok(collect(stmt.query(params![encode_uuid(id)])?, read_action)?.into_iter().next())
}

/// Most recent first. Ties on the timestamp fall back to insertion order.
pub fn list(conn: &Connection, limit: usize) -> Result<Vec<ActionLog>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {ACTION_COLUMNS} FROM dq_action_log
     ORDER BY created_at DESC, rowid DESC LIMIT ?1"
  ))?;
  collect(stmt.query(params![limit as i64])?, read_action)
}

pub fn delete(conn: &Connection, id: Uuid) -> Result<()> {
  conn.execute("DELETE FROM dq_action_log WHERE action_id = ?1", params![encode_uuid(id)])?;
  Ok(())
}
