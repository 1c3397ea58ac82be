//! harken-analyze library - offline aggregation of listening-test results
//!
//! Consumes the result bundles persisted by harken-web, discards sessions
//! that failed their attention checks, applies the deferred swap correction,
//! and aggregates scores per system and per utterance with 95% confidence
//! intervals.

pub mod aggregate;
pub mod attention;
pub mod bundle;
pub mod export;
pub mod stats;
