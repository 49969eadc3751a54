//! SQLite backend for the Lineage data-quality engine.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every detection run, remediation and
//! undo executes inside one SQLite transaction.

mod actions;
mod detection;
mod encode;
mod graph;
mod issues;
mod remediate;
mod schema;
mod store;
mod undo;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
