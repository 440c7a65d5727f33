//! Sales analytics
//!
//! The aggregation engine reduces completed sales selected by a
//! [`FilterSpec`](crate::models::FilterSpec) into dashboard metrics; the
//! report builder folds a full set of those metrics into a persisted snapshot.

pub mod engine;
pub mod report;

pub use engine::AggregationEngine;
pub use report::{ReportBuilder, REPORT_TOP_N};

use std::time::Duration;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("fact source unavailable")]
    SourceUnavailable(#[source] StorageError),
    #[error("aggregation timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report aggregation failed")]
    Aggregation(#[from] AggregationError),
    #[error("report could not be saved")]
    Persistence(#[source] StorageError),
}
