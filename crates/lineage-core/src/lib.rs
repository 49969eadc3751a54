//! Core types, primitives and detectors for the Lineage data-quality engine.
//!
//! This crate is deliberately free of database dependencies. Detectors are
//! pure functions over a [`graph::Graph`] snapshot; storage backends load the
//! snapshot, persist the findings, and implement [`store::QualityStore`].

pub mod action;
pub mod date;
pub mod detect;
pub mod document;
pub mod error;
pub mod graph;
pub mod issue;
pub mod settings;
pub mod similarity;
pub mod store;

pub use error::{Error, ErrorKind, Result};
